mod apply_status;
mod apply_workload;
mod cleanup;

use std::sync::Arc;

use async_trait::async_trait;
use expdep::k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use expdep::kube::Resource;
use expdep::kube::runtime::events::EventType;
use expdep::kube::runtime::{Controller, controller::Action, watcher};
use expdep::{ExperimentDeployment, ExperimentDeploymentStatus, Rollout, SourceKind};
use futures::Stream;

use crate::backoff::default_error_policy;
use crate::context::Context;
use crate::error::{ControllerResult, Error, Result};
use crate::events::reasons;
use crate::lifecycle::FINALIZER;
use crate::reconciler::{ReconcileError, Reconciler, ReconcilerExt};
use crate::status::record_failure;

pub struct ExperimentReconciler;

impl ExperimentReconciler {
    async fn publish(
        &self,
        ctx: &Context,
        experiment: &ExperimentDeployment,
        type_: EventType,
        reason: &str,
        note: String,
    ) {
        ctx.events
            .publish(&experiment.object_ref(&()), type_, reason, Some(note))
            .await;
    }

    /// Records a configuration problem that only a change to the ExperimentDeployment can fix.
    async fn reject(
        &self,
        ctx: &Context,
        experiment: &ExperimentDeployment,
        mut status: ExperimentDeploymentStatus,
        reason: &str,
        err: Error,
    ) -> Result<Action> {
        let message = err.to_string();
        tracing::warn!(reason, "{message}");
        self.publish(ctx, experiment, EventType::Warning, reason, message.clone())
            .await;
        record_failure(&mut status, reason, message, experiment.metadata.generation);
        self.apply_status(ctx, experiment, status).await?;
        Ok(Action::await_change())
    }
}

#[async_trait]
impl Reconciler for ExperimentReconciler {
    type Error = Error;

    async fn apply(&self, ctx: &Context, experiment: &ExperimentDeployment) -> Result<Action> {
        let status = experiment.status.clone().unwrap_or_default();
        let kind = match experiment.spec.source_ref.source_kind() {
            Ok(kind) => kind,
            Err(err) => {
                return self
                    .reject(ctx, experiment, status, reasons::UNSUPPORTED_SOURCE_KIND, err.into())
                    .await;
            }
        };
        if kind == SourceKind::Rollout && !ctx.rollouts_supported().await? {
            return self
                .reject(
                    ctx,
                    experiment,
                    status,
                    reasons::ROLLOUTS_NOT_SUPPORTED,
                    Error::RolloutsNotSupported,
                )
                .await;
        }
        match kind {
            SourceKind::Deployment => {
                self.apply_workload::<Deployment>(ctx, experiment, status)
                    .await
            }
            SourceKind::StatefulSet => {
                self.apply_workload::<StatefulSet>(ctx, experiment, status)
                    .await
            }
            SourceKind::Rollout => self.apply_workload::<Rollout>(ctx, experiment, status).await,
        }
    }

    async fn cleanup(&self, ctx: &Context, experiment: &ExperimentDeployment) -> Result<Action> {
        self.delete_workload(ctx, experiment).await
    }
}

/// Watches ExperimentDeployments and the workloads they own. Rollouts are only watched
/// when the cluster serves them.
pub async fn run(
    client: expdep::Client,
    ctx: Arc<Context>,
    rollouts: bool,
    shutdown_signal: impl Future<Output = ()> + Send + Sync + 'static,
) -> Result<
    impl Stream<Item = ControllerResult<ExperimentDeployment, ReconcileError<Error>>>,
    ReconcileError<Error>,
> {
    let namespace = ctx.config.namespace.clone();
    let namespace = namespace.as_deref();
    let experiments = client.api_scoped::<ExperimentDeployment>(namespace);
    let deployments = client.api_scoped::<Deployment>(namespace);
    let statefulsets = client.api_scoped::<StatefulSet>(namespace);
    let mut controller = Controller::new(experiments.kube().clone(), watcher::Config::default())
        .owns(deployments.kube().clone(), watcher::Config::default())
        .owns(statefulsets.kube().clone(), watcher::Config::default());
    if rollouts {
        let rollouts = client.api_scoped::<Rollout>(namespace);
        controller = controller.owns(rollouts.kube().clone(), watcher::Config::default());
    } else {
        tracing::warn!("Argo Rollouts are not served by this cluster, not watching Rollouts");
    }
    Ok(controller.graceful_shutdown_on(shutdown_signal).run(
        ExperimentReconciler.reconcile(FINALIZER).await?,
        default_error_policy,
        ctx,
    ))
}
