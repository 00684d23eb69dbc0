use std::fmt::{Debug, Display};
use std::sync::Arc;

use expdep::prelude::*;
use futures::future::{BoxFuture, FutureExt};
use tower::{Layer, Service};
use tracing::Instrument;

use crate::context::Context;

/// Runs each reconcile in a span naming the object and logs how it ended.
pub struct TraceService<S> {
    inner: S,
}

impl<S, T> Service<(Arc<T>, Arc<Context>)> for TraceService<S>
where
    S: Service<(Arc<T>, Arc<Context>)> + Send,
    T: Resource + Send + Sync,
    S::Future: Send + 'static,
    S::Error: Display,
    S::Response: Debug,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }
    fn call(&mut self, req: (Arc<T>, Arc<Context>)) -> Self::Future {
        let span = tracing::info_span!(
            "reconcile",
            name = %req.0.name_any(),
            namespace = %req.0.namespace().unwrap_or_default(),
            generation = ?req.0.meta().generation,
        );
        let fut = {
            let _guard = span.enter();
            self.inner.call(req)
        };
        async move {
            match fut.await {
                Ok(ret) => {
                    tracing::debug!("Reconciled {ret:?}");
                    Ok(ret)
                }
                Err(err) => {
                    tracing::error!(error = %err, "Reconcile failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .boxed()
    }
}

pub struct TraceLayer;

impl<S> Layer<S> for TraceLayer {
    type Service = TraceService<S>;
    fn layer(&self, inner: S) -> TraceService<S> {
        TraceService { inner }
    }
}
