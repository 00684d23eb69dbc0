use async_trait::async_trait;
use expdep::k8s_openapi::api::core::v1::ObjectReference;
use expdep::kube::runtime::events::{Event, EventType, Recorder, Reporter};
#[cfg(test)]
use mockall::automock;

pub const ACTION_RECONCILE: &str = "Reconcile";

/// Fire-and-forget publishing of Kubernetes Events. Failures are logged, never returned.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        reference: &ObjectReference,
        type_: EventType,
        reason: &str,
        note: Option<String>,
    );
}

pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    pub fn new(client: &expdep::Client) -> Self {
        let reporter = Reporter {
            controller: client.name().to_string(),
            instance: None,
        };
        Self {
            recorder: Recorder::new(client.kube().clone(), reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        reference: &ObjectReference,
        type_: EventType,
        reason: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: ACTION_RECONCILE.to_string(),
            secondary: None,
        };
        if let Err(err) = self.recorder.publish(&event, reference).await {
            tracing::warn!(reason, error = %err, "Failed to publish event");
        }
    }
}

pub mod reasons {
    pub const UNSUPPORTED_SOURCE_KIND: &str = "UnsupportedSourceKind";
    pub const ROLLOUTS_NOT_SUPPORTED: &str = "RolloutsNotSupported";
    pub const SOURCE_NOT_FOUND: &str = "SourceNotFound";
    pub const CONSTRUCTION_FAILED: &str = "ConstructionFailed";
    pub const UPSERT_FAILED: &str = "UpsertFailed";
    pub const EXPERIMENT_WORKLOAD_NOT_FOUND: &str = "ExperimentWorkloadNotFound";
    pub const RECONCILE_SUCCESS: &str = "ReconcileSuccess";
    pub const NOT_READY: &str = "NotReady";
    pub const PROGRESSING: &str = "Progressing";
    pub const CREATED: &str = "Created";
    pub const UPDATED: &str = "Updated";
    pub const DELETED: &str = "Deleted";
}
