use std::sync::Arc;
use std::time::Duration;

use futures::prelude::*;
use tower_http::BoxError;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use expdep_controller::{
    Capabilities, ClusterClient, Config, Context, ControllerStreamExt, KubeClusterClient,
    KubeEventPublisher, controllers,
};

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        future::pending::<()>().await;
    }
}

async fn shutdown_signal() {
    ctrl_c().await;
    tracing::info!("Received shutdown signal, shutting down experiment controller...");
}

async fn shutdown_timeout(timeout: Duration) -> Result<(), BoxError> {
    ctrl_c().await;
    tokio::time::sleep(timeout).await;
    tracing::warn!("Shutdown timeout reached, shutting down forcefully");
    Err(BoxError::from("Shutdown timeout reached"))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();
    let config = Config::load()?;

    let mut builder = expdep::Client::builder();
    builder.name(&config.name);
    let client = builder.build().await?;

    let cluster = KubeClusterClient::new(client.clone(), config.conflict_retries);
    let rollouts = match cluster.serves_rollouts().await {
        Ok(rollouts) => rollouts,
        Err(err) => {
            tracing::warn!(error = %err, "Failed to probe for Argo Rollouts, assuming absent");
            false
        }
    };
    let capabilities = Capabilities::new(config.capability_ttl()).with_rollouts(rollouts);
    let events = KubeEventPublisher::new(&client);
    let ctx = Arc::new(
        Context::new(Arc::new(cluster), Arc::new(events), config.clone())
            .with_capabilities(capabilities),
    );

    tracing::info!(
        "Processing events in {}...",
        config
            .namespace
            .as_deref()
            .map(|namespace| format!("namespace {namespace}"))
            .unwrap_or_else(|| "all namespaces".to_string())
    );
    future::try_select(
        controllers::experiment::run(client, ctx, rollouts, shutdown_signal())
            .await?
            .wait()
            .map(|_| Ok::<_, BoxError>(())),
        shutdown_timeout(Duration::from_secs(60)).boxed(),
    )
    .await
    .map(|_| ())
    .map_err(|err| err.factor_first().0)
}
