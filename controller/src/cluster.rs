//! Every call the reconciler makes against the cluster goes through [`ClusterClient`].

use async_trait::async_trait;
use expdep::k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use expdep::kube::api::ObjectMeta;
use expdep::kube::core::GroupVersionKind;
use expdep::prelude::*;
use expdep::{ExperimentDeployment, Rollout, SourceKind};
use json_patch::jsonptr::{PointerBuf, Token};
use json_patch::{AddOperation, Patch, PatchOperation, RemoveOperation, TestOperation};
#[cfg(test)]
use mockall::automock;

use crate::error::Result;
use crate::upsert::{UpsertOutcome, apply_desired};
use crate::workload::{AnyWorkload, WorkloadKind};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn add_finalizer(&self, experiment: &ExperimentDeployment, finalizer: &str) -> Result<()>;

    async fn remove_finalizer(
        &self,
        experiment: &ExperimentDeployment,
        finalizer: &str,
    ) -> Result<()>;

    /// Writes `experiment.status` through the status subresource.
    async fn patch_status(&self, experiment: &ExperimentDeployment) -> Result<()>;

    async fn get_workload(
        &self,
        kind: SourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AnyWorkload>>;

    /// Create-or-update `desired` under `owner`, retrying on write conflicts.
    async fn upsert_workload(
        &self,
        owner: &ExperimentDeployment,
        desired: AnyWorkload,
    ) -> Result<(AnyWorkload, UpsertOutcome)>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_workload(&self, kind: SourceKind, namespace: &str, name: &str)
    -> Result<bool>;

    async fn serves_rollouts(&self) -> Result<bool>;
}

pub struct KubeClusterClient {
    client: expdep::Client,
    conflict_retries: u32,
}

impl KubeClusterClient {
    pub fn new(client: expdep::Client, conflict_retries: u32) -> Self {
        Self {
            client,
            conflict_retries,
        }
    }

    async fn get<K: WorkloadKind>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AnyWorkload>> {
        Ok(self
            .client
            .api_namespaced::<K>(namespace)
            .get_opt(name)
            .await?
            .map(K::into_any))
    }

    async fn delete<K: WorkloadKind>(&self, namespace: &str, name: &str) -> Result<bool> {
        Ok(self
            .client
            .api_namespaced::<K>(namespace)
            .delete_opt(name)
            .await?)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(kind = %K::SOURCE_KIND, name = ?desired.meta().name))]
    async fn upsert<K: WorkloadKind>(
        &self,
        owner: &ExperimentDeployment,
        desired: K,
    ) -> Result<(AnyWorkload, UpsertOutcome)> {
        let namespace = desired.require_namespace()?;
        let name = desired.name()?;
        let api = self.client.api_namespaced::<K>(namespace);
        let mut attempt = 0;
        loop {
            let result = match api.get_opt(name).await? {
                None => {
                    let mut stub = K::from_parts(
                        ObjectMeta {
                            name: Some(name.to_string()),
                            namespace: Some(namespace.to_string()),
                            ..Default::default()
                        },
                        Default::default(),
                    );
                    apply_desired(&mut stub, &desired, owner)?;
                    api.create(&stub)
                        .await
                        .map(|created| (created, UpsertOutcome::Created))
                }
                Some(live) => {
                    let mut next = live.clone();
                    apply_desired(&mut next, &desired, owner)?;
                    if serde_json::to_value(&next)? == serde_json::to_value(&live)? {
                        return Ok((live.into_any(), UpsertOutcome::Unchanged));
                    }
                    api.replace(&next).await.map(|updated| {
                        let outcome = if updated.resource_version() == live.resource_version() {
                            UpsertOutcome::Unchanged
                        } else {
                            UpsertOutcome::Updated
                        };
                        (updated, outcome)
                    })
                }
            };
            match result {
                Err(err) if err.is_conflict() && attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::debug!(attempt, "Write conflict, re-reading {name}");
                }
                result => {
                    return result
                        .map(|(workload, outcome)| (workload.into_any(), outcome))
                        .map_err(Into::into);
                }
            }
        }
    }
}

fn finalizers_pointer() -> PointerBuf {
    PointerBuf::from_tokens(["metadata", "finalizers"])
}

/// A patch that appends `finalizer`, failing if the list changed since `current` was read.
pub fn add_finalizer_patch(current: Option<&[String]>, finalizer: &str) -> Patch {
    match current.filter(|current| !current.is_empty()) {
        None => Patch(vec![
            PatchOperation::Test(TestOperation {
                path: finalizers_pointer(),
                value: serde_json::Value::Null,
            }),
            PatchOperation::Add(AddOperation {
                path: finalizers_pointer(),
                value: serde_json::json!([finalizer]),
            }),
        ]),
        Some(current) => Patch(vec![
            PatchOperation::Test(TestOperation {
                path: finalizers_pointer(),
                value: serde_json::json!(current),
            }),
            PatchOperation::Add(AddOperation {
                path: PointerBuf::from_tokens([
                    Token::from("metadata"),
                    Token::from("finalizers"),
                    Token::from("-"),
                ]),
                value: serde_json::json!(finalizer),
            }),
        ]),
    }
}

/// A patch that removes the entry at `index`, failing if it is no longer `finalizer`.
pub fn remove_finalizer_patch(index: usize, finalizer: &str) -> Patch {
    let path = PointerBuf::from_tokens([
        Token::from("metadata"),
        Token::from("finalizers"),
        Token::from(index.to_string()),
    ]);
    Patch(vec![
        PatchOperation::Test(TestOperation {
            path: path.clone(),
            value: serde_json::json!(finalizer),
        }),
        PatchOperation::Remove(RemoveOperation { path }),
    ])
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    #[tracing::instrument(level = "debug", skip(self, experiment), fields(name = ?experiment.metadata.name), err)]
    async fn add_finalizer(&self, experiment: &ExperimentDeployment, finalizer: &str) -> Result<()> {
        let patch = add_finalizer_patch(experiment.metadata.finalizers.as_deref(), finalizer);
        self.client
            .api_namespaced::<ExperimentDeployment>(experiment.require_namespace()?)
            .patch_json(experiment.name()?, patch)
            .await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self, experiment), fields(name = ?experiment.metadata.name), err)]
    async fn remove_finalizer(
        &self,
        experiment: &ExperimentDeployment,
        finalizer: &str,
    ) -> Result<()> {
        let Some(index) = experiment
            .finalizers()
            .iter()
            .position(|f| f == finalizer)
        else {
            return Ok(());
        };
        let api = self
            .client
            .api_namespaced::<ExperimentDeployment>(experiment.require_namespace()?);
        match api
            .patch_json(experiment.name()?, remove_finalizer_patch(index, finalizer))
            .await
        {
            Err(err) if err.is_not_found() => Ok(()),
            result => result.map(|_| ()).map_err(Into::into),
        }
    }

    async fn patch_status(&self, experiment: &ExperimentDeployment) -> Result<()> {
        self.client
            .api_namespaced::<ExperimentDeployment>(experiment.require_namespace()?)
            .patch_status(experiment)
            .await?;
        Ok(())
    }

    async fn get_workload(
        &self,
        kind: SourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<AnyWorkload>> {
        match kind {
            SourceKind::Deployment => self.get::<Deployment>(namespace, name).await,
            SourceKind::StatefulSet => self.get::<StatefulSet>(namespace, name).await,
            SourceKind::Rollout => self.get::<Rollout>(namespace, name).await,
        }
    }

    async fn upsert_workload(
        &self,
        owner: &ExperimentDeployment,
        desired: AnyWorkload,
    ) -> Result<(AnyWorkload, UpsertOutcome)> {
        match desired {
            AnyWorkload::Deployment(desired) => self.upsert(owner, desired).await,
            AnyWorkload::StatefulSet(desired) => self.upsert(owner, desired).await,
            AnyWorkload::Rollout(desired) => self.upsert(owner, desired).await,
        }
    }

    async fn delete_workload(
        &self,
        kind: SourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<bool> {
        match kind {
            SourceKind::Deployment => self.delete::<Deployment>(namespace, name).await,
            SourceKind::StatefulSet => self.delete::<StatefulSet>(namespace, name).await,
            SourceKind::Rollout => self.delete::<Rollout>(namespace, name).await,
        }
    }

    async fn serves_rollouts(&self) -> Result<bool> {
        let gvk = GroupVersionKind::gvk("argoproj.io", "v1alpha1", "Rollout");
        Ok(self.client.serves(&gvk).await?)
    }
}
