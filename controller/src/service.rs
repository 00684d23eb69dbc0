use std::sync::Arc;

use expdep::ExperimentDeployment;
use expdep::kube::runtime::controller::Action;
use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tower::{Service, ServiceExt};

use crate::context::Context;
use crate::error::Error;
use crate::lifecycle::Lifecycle;
use crate::reconciler::Reconciler;

#[derive(Debug, Error)]
pub enum FinalizerError<E>
where
    E: std::error::Error + 'static,
{
    #[error("failed to apply object: {0}")]
    ApplyFailed(#[source] E),
    #[error("failed to clean up object: {0}")]
    CleanupFailed(#[source] E),
    #[error("failed to add finalizer: {0}")]
    AddFinalizer(#[source] Error),
    #[error("failed to remove finalizer: {0}")]
    RemoveFinalizer(#[source] Error),
}

/// Drives the finalizer lifecycle around a [`Reconciler`]: the finalizer is attached before
/// anything is applied, and only removed once cleanup succeeded.
pub struct Finalizer<T> {
    name: String,
    reconciler: Arc<T>,
}

impl<T> Finalizer<T> {
    pub fn new(name: impl ToString, reconciler: T) -> Self {
        Self {
            name: name.to_string(),
            reconciler: Arc::new(reconciler),
        }
    }
}

impl<T> Service<(Arc<ExperimentDeployment>, Arc<Context>)> for Finalizer<T>
where
    T: Reconciler + Send + Sync + 'static,
    T::Error: std::error::Error + Send + 'static,
{
    type Response = Action;
    type Error = FinalizerError<T::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
    fn call(
        &mut self,
        (resource, ctx): (Arc<ExperimentDeployment>, Arc<Context>),
    ) -> Self::Future {
        let finalizer = self.name.clone();
        let reconciler = self.reconciler.clone();
        async move {
            match Lifecycle::of(resource.as_ref(), &finalizer) {
                Lifecycle::Active {
                    finalizer_attached: false,
                } => {
                    ctx.add_finalizer(&resource, &finalizer)
                        .await
                        .map_err(FinalizerError::AddFinalizer)?;
                    Ok(Action::await_change())
                }
                Lifecycle::Active {
                    finalizer_attached: true,
                } => reconciler
                    .apply(&ctx, &resource)
                    .await
                    .map_err(FinalizerError::ApplyFailed),
                Lifecycle::Finalizing => {
                    let action = reconciler
                        .cleanup(&ctx, &resource)
                        .await
                        .map_err(FinalizerError::CleanupFailed)?;
                    ctx.remove_finalizer(&resource, &finalizer)
                        .await
                        .map_err(FinalizerError::RemoveFinalizer)?;
                    Ok(action)
                }
                Lifecycle::Released => Ok(Action::await_change()),
            }
        }
        .boxed()
    }
}

pub async fn reconcile<S, T>(
    mut service: S,
) -> Result<Box<dyn FnMut(Arc<T>, Arc<Context>) -> S::Future + Send>, S::Error>
where
    S: Service<(Arc<T>, Arc<Context>)> + Send + 'static,
{
    service.ready().await?;
    Ok(Box::new(move |resource: Arc<T>, ctx: Arc<Context>| {
        service.call((resource, ctx))
    }))
}
