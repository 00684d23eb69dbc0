use expdep::kube::runtime::controller::Action;
use expdep::{ExperimentDeployment, ExperimentDeploymentStatus};

use super::ExperimentReconciler;
use crate::context::Context;
use crate::error::Result;

impl ExperimentReconciler {
    /// Persists `status` stamped with the generation it was computed for.
    #[tracing::instrument(level = "debug", skip_all, err)]
    pub(crate) async fn apply_status(
        &self,
        ctx: &Context,
        experiment: &ExperimentDeployment,
        mut status: ExperimentDeploymentStatus,
    ) -> Result<()> {
        status.observed_generation = experiment.metadata.generation.unwrap_or_default();
        if experiment.status.as_ref() == Some(&status) {
            return Ok(());
        }
        let mut updated = experiment.clone();
        updated.status = Some(status);
        match ctx.patch_status(&updated).await {
            Err(err) if err.is_not_found() => {
                tracing::info!("ExperimentDeployment is gone, skipping status update");
                Ok(())
            }
            result => result,
        }
    }

    pub(crate) fn requeue_until_ready(
        ctx: &Context,
        status: &ExperimentDeploymentStatus,
    ) -> Action {
        if status.is_ready() {
            Action::await_change()
        } else {
            Action::requeue(ctx.config.not_ready_requeue())
        }
    }
}
