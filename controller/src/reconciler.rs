use std::sync::Arc;

use async_trait::async_trait;
use expdep::ExperimentDeployment;
use expdep::kube::runtime::controller::Action;
use futures::future::{BoxFuture, FutureExt};
use tower::{Service, ServiceBuilder};

use crate::backoff::{BackoffError, DefaultBackoffBuilder, DefaultBackoffLayer};
use crate::context::Context;
use crate::service::{Finalizer, FinalizerError, reconcile};
use crate::tracing::TraceLayer;

#[async_trait]
pub trait Reconciler: Send + Sync {
    type Error;

    async fn apply(
        &self,
        ctx: &Context,
        resource: &ExperimentDeployment,
    ) -> Result<Action, Self::Error>;

    async fn cleanup(
        &self,
        _ctx: &Context,
        _resource: &ExperimentDeployment,
    ) -> Result<Action, Self::Error> {
        Ok(Action::await_change())
    }
}

pub type ReconcileError<E> = BackoffError<FinalizerError<E>>;
type ReconcileFuture<E> = BoxFuture<'static, Result<Action, ReconcileError<E>>>;
type ReconcileFn<R, E> = Box<dyn FnMut(Arc<R>, Arc<Context>) -> ReconcileFuture<E> + Send>;

#[allow(clippy::type_complexity)]
pub trait ReconcilerExt: Reconciler {
    fn service(
        self,
        name: impl ToString,
    ) -> impl Service<
        (Arc<ExperimentDeployment>, Arc<Context>),
        Response = Action,
        Error = ReconcileError<Self::Error>,
        Future = ReconcileFuture<Self::Error>,
    > + Send
    + 'static
    where
        Self: Sized + Send + Sync + 'static,
        Self::Error: std::error::Error + Send + Sync + 'static,
    {
        ServiceBuilder::new()
            .layer(TraceLayer)
            .layer(DefaultBackoffLayer::new(DefaultBackoffBuilder))
            .service(Finalizer::new(name, self))
    }

    fn reconcile(
        self,
        name: impl ToString,
    ) -> BoxFuture<
        'static,
        Result<ReconcileFn<ExperimentDeployment, Self::Error>, ReconcileError<Self::Error>>,
    >
    where
        Self: Sized + Send + Sync + 'static,
        Self::Error: std::error::Error + Send + Sync + 'static,
    {
        reconcile(self.service(name)).boxed()
    }
}

impl<T> ReconcilerExt for T where T: Reconciler {}
