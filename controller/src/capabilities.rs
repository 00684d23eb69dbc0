use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::cluster::ClusterClient;
use crate::error::Result;

#[derive(Clone, Copy, Debug)]
struct Probe {
    available: bool,
    checked_at: Instant,
}

/// Cached answer to "does the cluster serve Argo Rollouts", re-probed once it is older than `ttl`.
pub struct Capabilities {
    rollouts: RwLock<Option<Probe>>,
    ttl: Duration,
}

impl Capabilities {
    pub fn new(ttl: Duration) -> Self {
        Self {
            rollouts: RwLock::new(None),
            ttl,
        }
    }

    /// Seeds the cache with the result of the startup probe.
    pub fn with_rollouts(self, available: bool) -> Self {
        Self {
            rollouts: RwLock::new(Some(Probe {
                available,
                checked_at: Instant::now(),
            })),
            ttl: self.ttl,
        }
    }

    pub async fn rollouts(&self, client: &dyn ClusterClient) -> Result<bool> {
        let cached = *self.rollouts.read().await;
        if let Some(probe) = cached.filter(|probe| probe.checked_at.elapsed() < self.ttl) {
            return Ok(probe.available);
        }
        let available = client.serves_rollouts().await?;
        tracing::debug!(available, "Probed for Argo Rollouts");
        *self.rollouts.write().await = Some(Probe {
            available,
            checked_at: Instant::now(),
        });
        Ok(available)
    }
}
