use expdep::SourceKind;
use expdep::k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use expdep::k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use expdep::kube::api::ObjectMeta;

use super::{AnyWorkload, Observation, Progressing, WorkloadKind};

impl WorkloadKind for Deployment {
    const SOURCE_KIND: SourceKind = SourceKind::Deployment;

    type Spec = DeploymentSpec;

    fn from_parts(metadata: ObjectMeta, spec: DeploymentSpec) -> Self {
        Deployment {
            metadata,
            spec: Some(spec),
            status: None,
        }
    }

    fn spec(&self) -> Option<&DeploymentSpec> {
        self.spec.as_ref()
    }

    fn set_spec(&mut self, spec: DeploymentSpec) {
        self.spec = Some(spec);
    }

    fn replicas_mut(spec: &mut DeploymentSpec) -> &mut Option<i32> {
        &mut spec.replicas
    }

    fn template_meta(spec: &DeploymentSpec) -> Option<&ObjectMeta> {
        spec.template.metadata.as_ref()
    }

    fn template_meta_mut(spec: &mut DeploymentSpec) -> &mut ObjectMeta {
        spec.template.metadata.get_or_insert_with(Default::default)
    }

    fn set_selector(spec: &mut DeploymentSpec, selector: LabelSelector) {
        spec.selector = selector;
    }

    fn selector(spec: &DeploymentSpec) -> Option<&LabelSelector> {
        Some(&spec.selector)
    }

    fn observe(&self) -> Observation {
        let status = self.status.clone().unwrap_or_default();
        let progressing = status
            .conditions
            .unwrap_or_default()
            .into_iter()
            .find(|condition| condition.type_ == "Progressing")
            .map(|condition| Progressing {
                status: condition.status,
                reason: condition.reason,
                message: condition.message,
            });
        Observation {
            generation: self.metadata.generation,
            observed_generation: status.observed_generation,
            desired_replicas: self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            ready_replicas: status.ready_replicas.unwrap_or_default(),
            updated_replicas: status.updated_replicas.unwrap_or_default(),
            progressing,
            message: None,
        }
    }

    fn into_any(self) -> AnyWorkload {
        AnyWorkload::Deployment(self)
    }

    fn from_any(any: AnyWorkload) -> Option<Self> {
        match any {
            AnyWorkload::Deployment(deployment) => Some(deployment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_observe_reads_progressing_condition() {
        let deployment: Deployment = serde_json::from_value(json!({
            "metadata": {"name": "exp", "namespace": "default", "generation": 3},
            "spec": {
                "replicas": 2,
                "selector": {"matchLabels": {"app": "web"}},
                "template": {"metadata": {"labels": {"app": "web"}}}
            },
            "status": {
                "observedGeneration": 3,
                "readyReplicas": 1,
                "updatedReplicas": 2,
                "conditions": [
                    {"type": "Available", "status": "False"},
                    {
                        "type": "Progressing",
                        "status": "False",
                        "reason": "ProgressDeadlineExceeded",
                        "message": "ReplicaSet \"exp-5d\" has timed out progressing."
                    }
                ]
            }
        }))
        .unwrap();
        let observation = deployment.observe();
        assert_eq!(observation.desired_replicas, 2);
        assert_eq!(observation.ready_replicas, 1);
        assert!(!observation.is_ready());
        let progressing = observation.progressing.unwrap();
        assert_eq!(progressing.status, "False");
        assert_eq!(
            progressing.reason.as_deref(),
            Some("ProgressDeadlineExceeded")
        );
    }

    #[test]
    fn test_observe_without_status() {
        let deployment = Deployment::from_parts(
            ObjectMeta {
                generation: Some(1),
                ..Default::default()
            },
            DeploymentSpec::default(),
        );
        let observation = deployment.observe();
        assert_eq!(observation.desired_replicas, 1);
        assert_eq!(observation.observed_generation, None);
        assert!(!observation.is_ready());
    }
}
