use expdep::kube::runtime::controller::Action;
use expdep::kube::runtime::events::EventType;
use expdep::prelude::*;
use expdep::{ExperimentDeployment, ExperimentDeploymentStatus};

use super::ExperimentReconciler;
use crate::context::Context;
use crate::desired::build_desired;
use crate::error::Result;
use crate::events::reasons;
use crate::status::{project, record_failure};
use crate::workload::WorkloadKind;

impl ExperimentReconciler {
    /// Fetch the source, build and upsert the experiment workload, then project its state.
    #[tracing::instrument(level = "debug", skip_all, fields(kind = %K::SOURCE_KIND), err)]
    pub(crate) async fn apply_workload<K: WorkloadKind>(
        &self,
        ctx: &Context,
        experiment: &ExperimentDeployment,
        mut status: ExperimentDeploymentStatus,
    ) -> Result<Action> {
        let generation = experiment.metadata.generation;
        let source_namespace = experiment.source_namespace()?;
        let source_name = experiment.spec.source_ref.name.as_str();
        let source = ctx
            .get_workload(K::SOURCE_KIND, source_namespace, source_name)
            .await?
            .and_then(K::from_any);
        let Some(source) = source else {
            let message = format!(
                "source {} {source_namespace}/{source_name} not found",
                K::SOURCE_KIND
            );
            tracing::warn!("{message}");
            self.publish(
                ctx,
                experiment,
                EventType::Warning,
                reasons::SOURCE_NOT_FOUND,
                message.clone(),
            )
            .await;
            record_failure(&mut status, reasons::SOURCE_NOT_FOUND, message, generation);
            self.apply_status(ctx, experiment, status).await?;
            return Ok(Action::requeue(ctx.config.source_not_found_requeue()));
        };

        let desired = match build_desired(experiment, &source) {
            Ok(desired) => desired,
            Err(err) if err.is_terminal() => {
                return self
                    .reject(ctx, experiment, status, reasons::CONSTRUCTION_FAILED, err)
                    .await;
            }
            Err(err) => return Err(err),
        };

        let (derived, outcome) = match ctx.upsert_workload(experiment, desired.into_any()).await {
            Ok(upserted) => upserted,
            Err(err) => {
                tracing::error!(error = %err, "Failed to upsert experiment {}", K::SOURCE_KIND);
                self.publish(
                    ctx,
                    experiment,
                    EventType::Warning,
                    reasons::UPSERT_FAILED,
                    err.to_string(),
                )
                .await;
                record_failure(&mut status, reasons::UPSERT_FAILED, err.to_string(), generation);
                if let Err(status_err) = self.apply_status(ctx, experiment, status).await {
                    tracing::warn!(error = %status_err, "Failed to record upsert failure");
                }
                return Err(err);
            }
        };

        self.delete_replaced_workload(ctx, experiment, K::SOURCE_KIND)
            .await?;

        let namespace = experiment.require_namespace()?;
        let name = derived.name();
        if let Some(reason) = outcome.event_reason() {
            tracing::info!(%outcome, "{} {namespace}/{name}", K::SOURCE_KIND);
            self.publish(
                ctx,
                experiment,
                EventType::Normal,
                reason,
                format!("{outcome} {} {namespace}/{name}", K::SOURCE_KIND),
            )
            .await;
        }

        let current = ctx.get_workload(K::SOURCE_KIND, namespace, &name).await?;
        project(
            &mut status,
            K::SOURCE_KIND,
            namespace,
            &name,
            current.as_ref(),
            generation,
        );
        let action = Self::requeue_until_ready(ctx, &status);
        self.apply_status(ctx, experiment, status).await?;
        Ok(action)
    }
}
