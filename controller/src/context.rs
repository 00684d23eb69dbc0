use std::ops::Deref;
use std::sync::Arc;

use crate::Config;
use crate::capabilities::Capabilities;
use crate::cluster::ClusterClient;
use crate::events::EventPublisher;

pub struct Context {
    pub client: Arc<dyn ClusterClient>,
    pub events: Arc<dyn EventPublisher>,
    pub capabilities: Capabilities,
    pub config: Config,
}

impl Deref for Context {
    type Target = dyn ClusterClient;

    fn deref(&self) -> &Self::Target {
        self.client.as_ref()
    }
}

impl Context {
    pub fn new(
        client: Arc<dyn ClusterClient>,
        events: Arc<dyn EventPublisher>,
        config: Config,
    ) -> Self {
        let capabilities = Capabilities::new(config.capability_ttl());
        Self {
            client,
            events,
            capabilities,
            config,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub async fn rollouts_supported(&self) -> crate::error::Result<bool> {
        self.capabilities.rollouts(self.client.as_ref()).await
    }
}
