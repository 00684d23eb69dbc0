use hyper_util::{client::legacy::Client as HttpClient, rt::TokioExecutor};
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use kube::client::ConfigExt as _;
use kube::core::GroupVersionKind;
use tower::ServiceBuilder;
use tower_http::{BoxError, trace::TraceLayer};

use crate::{Api, ClientBuildError, Result};

#[derive(Clone)]
pub struct Client {
    name: String,
    kube: kube::Client,
}

#[derive(Default)]
pub struct ClientBuilder {
    name: Option<String>,
}

impl ClientBuilder {
    pub fn name(&mut self, name: impl ToString) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    pub async fn build(&mut self) -> Result<Client, ClientBuildError> {
        let name = self
            .name
            .take()
            .unwrap_or_else(|| "experiment-controller".into());
        let config = kube::Config::infer().await?;
        let kube_service = ServiceBuilder::new()
            .layer(config.base_uri_layer())
            .option_layer(config.auth_layer()?)
            .layer(TraceLayer::new_for_http())
            .map_err(BoxError::from)
            .service(
                HttpClient::builder(TokioExecutor::new()).build(config.rustls_https_connector()?),
            );
        let kube_client = kube::Client::new(kube_service, config.default_namespace);
        Ok(Client::new(name, kube_client))
    }
}

impl Client {
    /// Wraps an already configured kube client. `name` is the field manager.
    pub fn new(name: impl ToString, kube: kube::Client) -> Self {
        Self {
            name: name.to_string(),
            kube,
        }
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Field manager name used for every write.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kube(&self) -> &kube::Client {
        &self.kube
    }

    #[inline]
    pub fn api_namespaced<T>(&self, namespace: &str) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope>,
        <T as Resource>::DynamicType: Default,
    {
        Api::new(
            self.name.clone(),
            kube::Api::namespaced(self.kube.clone(), namespace),
        )
    }

    #[inline]
    pub fn api_all<T>(&self) -> Api<T>
    where
        T: Resource,
        <T as Resource>::DynamicType: Default,
    {
        Api::new(self.name.clone(), kube::Api::all(self.kube.clone()))
    }

    /// Namespaced when a namespace is given, cluster-wide otherwise.
    pub fn api_scoped<T>(&self, namespace: Option<&str>) -> Api<T>
    where
        T: Resource<Scope = NamespaceResourceScope>,
        <T as Resource>::DynamicType: Default,
    {
        match namespace {
            Some(namespace) => self.api_namespaced(namespace),
            None => self.api_all(),
        }
    }

    /// Whether the API server serves the given kind.
    #[tracing::instrument(level = "debug", skip(self), ret, err)]
    pub async fn serves(&self, gvk: &GroupVersionKind) -> Result<bool> {
        match kube::discovery::pinned_kind(&self.kube, gvk).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Discovery(_)) => Ok(false),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::testing::{ScriptedServer, not_found, status};

    fn rollouts() -> GroupVersionKind {
        GroupVersionKind::gvk("argoproj.io", "v1alpha1", "Rollout")
    }

    fn resource_list(kinds: &[&str]) -> serde_json::Value {
        let resources: Vec<_> = kinds
            .iter()
            .map(|kind| {
                json!({
                    "name": format!("{}s", kind.to_lowercase()),
                    "singularName": kind.to_lowercase(),
                    "namespaced": true,
                    "kind": kind,
                    "verbs": ["get", "list", "watch", "create", "update", "delete"]
                })
            })
            .collect();
        json!({
            "kind": "APIResourceList",
            "apiVersion": "v1",
            "groupVersion": "argoproj.io/v1alpha1",
            "resources": resources
        })
    }

    #[tokio::test]
    async fn test_serves_rollouts() {
        let server = ScriptedServer::new([(200, resource_list(&["AnalysisRun", "Rollout"]))]);
        assert!(server.client().serves(&rollouts()).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_group_or_kind_is_not_served() {
        let server = ScriptedServer::new([not_found(), (200, resource_list(&["AnalysisRun"]))]);
        let client = server.client();
        assert!(!client.serves(&rollouts()).await.unwrap());
        assert!(!client.serves(&rollouts()).await.unwrap());
    }

    #[tokio::test]
    async fn test_discovery_failure_is_an_error() {
        let server = ScriptedServer::new([(503, status(503, "ServiceUnavailable"))]);
        assert!(server.client().serves(&rollouts()).await.is_err());
    }
}
