use std::str::FromStr;

use expdep::kube::runtime::controller::Action;
use expdep::kube::runtime::events::EventType;
use expdep::prelude::*;
use expdep::{ExperimentDeployment, ExperimentResourceRef, SourceKind};

use super::ExperimentReconciler;
use crate::context::Context;
use crate::error::Result;
use crate::events::reasons;

/// The experiment workload recorded in status by an earlier reconcile.
fn recorded_workload(
    experiment: &ExperimentDeployment,
) -> Option<(SourceKind, &ExperimentResourceRef)> {
    let reference = experiment.status.as_ref()?.experiment_resource_ref.as_ref()?;
    let kind = SourceKind::from_str(&reference.kind).ok()?;
    Some((kind, reference))
}

impl ExperimentReconciler {
    /// Deletes the experiment workload, plus a workload of an earlier kind still recorded
    /// in status. Missing workloads and unknown kinds are fine.
    #[tracing::instrument(level = "debug", skip_all, err)]
    pub(crate) async fn delete_workload(
        &self,
        ctx: &Context,
        experiment: &ExperimentDeployment,
    ) -> Result<Action> {
        let kind = experiment.spec.source_ref.source_kind().ok();
        match kind {
            Some(kind) => {
                let namespace = experiment.require_namespace()?;
                self.delete_one(ctx, experiment, kind, namespace, experiment.name()?)
                    .await?;
            }
            None => tracing::debug!("Unsupported source kind, nothing to delete"),
        }
        if let Some((recorded, reference)) = recorded_workload(experiment) {
            if kind != Some(recorded) {
                self.delete_one(ctx, experiment, recorded, &reference.namespace, &reference.name)
                    .await?;
            }
        }
        Ok(Action::await_change())
    }

    /// Removes the workload left behind when `sourceRef.kind` moved away from the recorded kind.
    pub(crate) async fn delete_replaced_workload(
        &self,
        ctx: &Context,
        experiment: &ExperimentDeployment,
        kind: SourceKind,
    ) -> Result<()> {
        match recorded_workload(experiment) {
            Some((recorded, reference)) if recorded != kind => {
                self.delete_one(ctx, experiment, recorded, &reference.namespace, &reference.name)
                    .await
            }
            _ => Ok(()),
        }
    }

    async fn delete_one(
        &self,
        ctx: &Context,
        experiment: &ExperimentDeployment,
        kind: SourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        if ctx.delete_workload(kind, namespace, name).await? {
            tracing::info!("Deleted experiment {kind} {namespace}/{name}");
            self.publish(
                ctx,
                experiment,
                EventType::Normal,
                reasons::DELETED,
                format!("Deleted {kind} {namespace}/{name}"),
            )
            .await;
        } else {
            tracing::debug!("Experiment {kind} {namespace}/{name} already gone");
        }
        Ok(())
    }
}
