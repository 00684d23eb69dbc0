use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use expdep::kube::Resource;
use expdep::kube::runtime::controller::Action;
use expdep::kube::runtime::reflector::ObjectRef;
use expdep::kube::runtime::{utils::Backoff, watcher::DefaultBackoff};
use futures::future::{BoxFuture, FutureExt};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tower::{Layer, Service};

use crate::context::Context;

#[derive(Debug, Error)]
pub struct BackoffError<E> {
    #[source]
    pub error: E,
    pub backoff: Option<Duration>,
}

impl<E> BackoffError<E> {
    pub fn new(error: E, backoff: Option<Duration>) -> Self {
        Self { error, backoff }
    }
}

impl<E> fmt::Display for BackoffError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(backoff) = self.backoff {
            write!(f, "{} (next wait: {:?})", self.error, backoff)
        } else {
            self.error.fmt(f)
        }
    }
}

pub trait BackoffBuilder {
    type Backoff: Backoff;
    fn build(&self) -> Self::Backoff;
}

/// Backoffs of objects that have not failed for this long are dropped, so objects deleted
/// while failing do not stay in the map.
pub const BACKOFF_IDLE_TTL: Duration = Duration::from_secs(600);

type Backoffs<B> = Arc<Mutex<HashMap<String, (B, Instant)>>>;

/// Tracks one backoff per object. A success forgets the object's backoff.
pub struct BackoffService<S, B: BackoffBuilder> {
    inner: S,
    builder: B,
    backoffs: Backoffs<B::Backoff>,
}

impl<S, B, R> Service<(Arc<R>, Arc<Context>)> for BackoffService<S, B>
where
    S: Service<(Arc<R>, Arc<Context>)>,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    S::Future: Send + 'static,
    R: Resource,
    R::DynamicType: Default,
    B: BackoffBuilder + Clone + Send + 'static,
    B::Backoff: 'static,
{
    type Response = S::Response;
    type Error = BackoffError<S::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner
            .poll_ready(cx)
            .map_err(|e| BackoffError::new(e, None))
    }
    fn call(&mut self, req: (Arc<R>, Arc<Context>)) -> Self::Future {
        let key = ObjectRef::from_obj(req.0.as_ref()).to_string();
        let ret = self.inner.call(req);
        let backoffs = self.backoffs.clone();
        let builder = self.builder.clone();
        async move {
            match ret.await {
                Ok(res) => {
                    backoffs.lock().await.remove(&key);
                    Ok(res)
                }
                Err(err) => {
                    let now = Instant::now();
                    let mut backoffs = backoffs.lock().await;
                    backoffs.retain(|_, (_, failed_at)| now - *failed_at < BACKOFF_IDLE_TTL);
                    let (backoff, failed_at) = backoffs
                        .entry(key)
                        .or_insert_with(|| (builder.build(), now));
                    *failed_at = now;
                    Err(BackoffError::new(err, backoff.next()))
                }
            }
        }
        .boxed()
    }
}

#[derive(Clone, Default)]
pub struct BackoffLayer<B> {
    backoff_builder: B,
}

impl<B> BackoffLayer<B> {
    pub fn new(backoff_builder: B) -> Self {
        Self { backoff_builder }
    }
}

impl<S, B> Layer<S> for BackoffLayer<B>
where
    B: BackoffBuilder + Clone,
{
    type Service = BackoffService<S, B>;

    fn layer(&self, inner: S) -> Self::Service {
        BackoffService {
            inner,
            builder: self.backoff_builder.clone(),
            backoffs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[derive(Clone, Default)]
pub struct DefaultBackoffBuilder;

impl BackoffBuilder for DefaultBackoffBuilder {
    type Backoff = DefaultBackoff;

    fn build(&self) -> Self::Backoff {
        DefaultBackoff::default()
    }
}

pub type DefaultBackoffLayer = BackoffLayer<DefaultBackoffBuilder>;

pub fn default_error_policy<R, E>(
    _object: Arc<R>,
    error: &BackoffError<E>,
    _ctx: Arc<Context>,
) -> Action {
    if let Some(backoff) = error.backoff {
        Action::requeue(backoff)
    } else {
        Action::await_change()
    }
}
