//! Maps what the controller saw onto the ExperimentDeployment status conditions.

use expdep::{
    CONDITION_READY, CONDITION_SYNCED, ExperimentDeploymentStatus, ExperimentResourceRef,
    SourceKind,
};

use crate::events::reasons;
use crate::workload::{AnyWorkload, Observation};

/// Marks both conditions false with the same reason.
pub fn record_failure(
    status: &mut ExperimentDeploymentStatus,
    reason: &str,
    message: impl Into<String>,
    generation: Option<i64>,
) {
    let message = message.into();
    status.set_condition(CONDITION_SYNCED, false, reason, message.clone(), generation);
    status.set_condition(CONDITION_READY, false, reason, message, generation);
}

/// Projects the freshly read experiment workload into `status`.
pub fn project(
    status: &mut ExperimentDeploymentStatus,
    kind: SourceKind,
    namespace: &str,
    name: &str,
    derived: Option<&AnyWorkload>,
    generation: Option<i64>,
) {
    let Some(derived) = derived else {
        status.experiment_resource_ref = None;
        status.ready_replicas = 0;
        record_failure(
            status,
            reasons::EXPERIMENT_WORKLOAD_NOT_FOUND,
            format!("{kind} {namespace}/{name} not found"),
            generation,
        );
        return;
    };
    let observation = derived.observe();
    status.experiment_resource_ref = Some(ExperimentResourceRef {
        kind: kind.to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    });
    status.ready_replicas = observation.ready_replicas;
    if observation.is_ready() {
        let message = format!("{kind} {name} is ready");
        status.set_condition(
            CONDITION_SYNCED,
            true,
            reasons::RECONCILE_SUCCESS,
            message.clone(),
            generation,
        );
        status.set_condition(
            CONDITION_READY,
            true,
            reasons::RECONCILE_SUCCESS,
            message,
            generation,
        );
    } else {
        let (reason, message) = not_ready_reason(kind, &observation);
        status.set_condition(
            CONDITION_SYNCED,
            true,
            reasons::RECONCILE_SUCCESS,
            format!("{kind} {name} is in sync"),
            generation,
        );
        status.set_condition(CONDITION_READY, false, &reason, message, generation);
    }
}

fn not_ready_reason(kind: SourceKind, observation: &Observation) -> (String, String) {
    let counts = format!(
        "{}/{} replicas ready, {} updated",
        observation.ready_replicas, observation.desired_replicas, observation.updated_replicas
    );
    if let Some(progressing) = &observation.progressing {
        match (progressing.status.as_str(), progressing.reason.as_deref()) {
            ("False", Some(reason)) => {
                let message = progressing.message.clone().unwrap_or(counts);
                return (reason.to_string(), message);
            }
            ("True", Some("NewReplicaSetAvailable")) => {
                return (reasons::PROGRESSING.to_string(), counts);
            }
            _ => {}
        }
    }
    let message = match &observation.message {
        Some(message) if !message.is_empty() => format!("{kind}: {message} ({counts})"),
        _ => counts,
    };
    (reasons::NOT_READY.to_string(), message)
}

#[cfg(test)]
mod tests {
    use expdep::k8s_openapi::api::apps::v1::{
        DeploymentCondition, DeploymentStatus, StatefulSetStatus,
    };

    use super::*;
    use crate::fixtures;

    fn deployment(status: DeploymentStatus) -> AnyWorkload {
        let mut deployment = fixtures::deployment("exp", 2);
        deployment.metadata.generation = Some(2);
        deployment.status = Some(status);
        AnyWorkload::Deployment(deployment)
    }

    fn progressing(status: &str, reason: &str) -> DeploymentCondition {
        DeploymentCondition {
            type_: "Progressing".into(),
            status: status.into(),
            reason: Some(reason.into()),
            message: Some(format!("{reason} happened")),
            ..Default::default()
        }
    }

    fn condition<'a>(status: &'a ExperimentDeploymentStatus, type_: &str) -> (&'a str, &'a str) {
        let condition = status.condition(type_).unwrap();
        (condition.status.as_str(), condition.reason.as_str())
    }

    #[test]
    fn test_ready_workload() {
        let mut status = ExperimentDeploymentStatus::default();
        let derived = deployment(DeploymentStatus {
            observed_generation: Some(2),
            ready_replicas: Some(2),
            updated_replicas: Some(2),
            ..Default::default()
        });
        project(&mut status, SourceKind::Deployment, "default", "exp", Some(&derived), Some(5));
        assert_eq!(condition(&status, CONDITION_READY), ("True", "ReconcileSuccess"));
        assert_eq!(condition(&status, CONDITION_SYNCED), ("True", "ReconcileSuccess"));
        assert_eq!(status.ready_replicas, 2);
        assert_eq!(
            status.experiment_resource_ref,
            Some(ExperimentResourceRef {
                kind: "Deployment".into(),
                name: "exp".into(),
                namespace: "default".into(),
            })
        );
        assert_eq!(
            status.condition(CONDITION_READY).unwrap().observed_generation,
            Some(5)
        );
    }

    #[test]
    fn test_progress_deadline_exceeded() {
        let mut status = ExperimentDeploymentStatus::default();
        let derived = deployment(DeploymentStatus {
            observed_generation: Some(2),
            ready_replicas: Some(0),
            updated_replicas: Some(2),
            conditions: Some(vec![progressing("False", "ProgressDeadlineExceeded")]),
            ..Default::default()
        });
        project(&mut status, SourceKind::Deployment, "default", "exp", Some(&derived), Some(1));
        assert_eq!(
            condition(&status, CONDITION_READY),
            ("False", "ProgressDeadlineExceeded")
        );
        assert_eq!(
            status.condition(CONDITION_READY).unwrap().message,
            "ProgressDeadlineExceeded happened"
        );
        assert_eq!(condition(&status, CONDITION_SYNCED), ("True", "ReconcileSuccess"));
    }

    #[test]
    fn test_progressing_and_plain_not_ready() {
        let mut status = ExperimentDeploymentStatus::default();
        let derived = deployment(DeploymentStatus {
            observed_generation: Some(1),
            ready_replicas: Some(1),
            updated_replicas: Some(2),
            conditions: Some(vec![progressing("True", "NewReplicaSetAvailable")]),
            ..Default::default()
        });
        project(&mut status, SourceKind::Deployment, "default", "exp", Some(&derived), Some(1));
        assert_eq!(condition(&status, CONDITION_READY), ("False", "Progressing"));

        let derived = deployment(DeploymentStatus {
            ready_replicas: Some(1),
            conditions: Some(vec![progressing("True", "ReplicaSetUpdated")]),
            ..Default::default()
        });
        project(&mut status, SourceKind::Deployment, "default", "exp", Some(&derived), Some(1));
        assert_eq!(condition(&status, CONDITION_READY), ("False", "NotReady"));
        assert_eq!(status.ready_replicas, 1);
    }

    #[test]
    fn test_statefulset_not_ready() {
        let mut statefulset = fixtures::statefulset("exp", 3);
        statefulset.metadata.generation = Some(1);
        statefulset.status = Some(StatefulSetStatus {
            observed_generation: Some(1),
            ready_replicas: Some(1),
            updated_replicas: Some(3),
            replicas: 3,
            ..Default::default()
        });
        let mut status = ExperimentDeploymentStatus::default();
        let derived = AnyWorkload::StatefulSet(statefulset);
        project(&mut status, SourceKind::StatefulSet, "default", "exp", Some(&derived), Some(1));
        assert_eq!(condition(&status, CONDITION_READY), ("False", "NotReady"));
        assert_eq!(
            status.condition(CONDITION_READY).unwrap().message,
            "1/3 replicas ready, 3 updated"
        );
    }

    #[test]
    fn test_missing_workload_clears_reference() {
        let mut status = ExperimentDeploymentStatus {
            experiment_resource_ref: Some(ExperimentResourceRef::default()),
            ready_replicas: 3,
            ..Default::default()
        };
        project(&mut status, SourceKind::Rollout, "default", "exp", None, Some(1));
        assert_eq!(status.experiment_resource_ref, None);
        assert_eq!(status.ready_replicas, 0);
        assert_eq!(
            condition(&status, CONDITION_READY),
            ("False", "ExperimentWorkloadNotFound")
        );
        assert_eq!(
            condition(&status, CONDITION_SYNCED),
            ("False", "ExperimentWorkloadNotFound")
        );
        assert_eq!(
            status.condition(CONDITION_SYNCED).unwrap().message,
            "Rollout default/exp not found"
        );
    }

    #[test]
    fn test_record_failure_sets_both_conditions() {
        let mut status = ExperimentDeploymentStatus::default();
        record_failure(&mut status, reasons::UPSERT_FAILED, "conflict", Some(3));
        assert_eq!(status.conditions.len(), 2);
        assert_eq!(condition(&status, CONDITION_READY), ("False", "UpsertFailed"));
        assert_eq!(condition(&status, CONDITION_SYNCED), ("False", "UpsertFailed"));
    }
}
