use std::fmt::Debug;

use kube::{
    Resource,
    api::{DeleteParams, Patch, PatchParams, PostParams},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{ResourceNameExt, Result};

pub struct Api<T> {
    name: String,
    inner: kube::api::Api<T>,
}

impl<T> Api<T> {
    pub fn new(name: String, inner: kube::api::Api<T>) -> Self {
        Self { name, inner }
    }
}

impl<T> Api<T>
where
    T: Resource + Serialize + DeserializeOwned + Clone + Debug + Send + 'static,
{
    #[inline]
    pub fn kube(&self) -> &kube::Api<T> {
        &self.inner
    }

    #[inline]
    pub fn patch_params(&self) -> PatchParams {
        PatchParams::apply(&self.name)
    }

    #[inline]
    pub fn post_params(&self) -> PostParams {
        PostParams {
            field_manager: Some(self.name.clone()),
            ..Default::default()
        }
    }

    #[tracing::instrument(level = "debug", skip(self), ret, err)]
    pub async fn get_opt(&self, name: &str) -> Result<Option<T>> {
        Ok(self.inner.get_opt(name).await?)
    }

    #[tracing::instrument(level = "debug", skip(self, resource), ret, err)]
    pub async fn create(&self, resource: &T) -> Result<T> {
        Ok(self.inner.create(&self.post_params(), resource).await?)
    }

    /// Full update. Fails with a conflict when `resource` carries a stale resourceVersion.
    #[tracing::instrument(level = "debug", skip(self, resource), ret, err)]
    pub async fn replace(&self, resource: &T) -> Result<T> {
        Ok(self
            .inner
            .replace(resource.name()?, &self.post_params(), resource)
            .await?)
    }

    /// Returns `false` when there was nothing to delete.
    #[tracing::instrument(level = "debug", skip(self), ret, err)]
    pub async fn delete_opt(&self, name: &str) -> Result<bool> {
        match self.inner.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    #[tracing::instrument(level = "debug", skip(self), ret, err)]
    pub async fn patch_json(&self, name: &str, patch: json_patch::Patch) -> Result<T> {
        Ok(self
            .inner
            .patch(name, &PatchParams::default(), &Patch::Json::<()>(patch))
            .await?)
    }

    #[tracing::instrument(level = "debug", skip(self, resource), ret, err)]
    pub async fn patch_status(&self, resource: &T) -> Result<T> {
        let mut json = serde_json::to_value(resource)?;
        let Some(object) = json.as_object_mut() else {
            return Err(crate::Error::expected_json_type("object", &json));
        };
        object.remove("spec");
        object.remove("metadata");
        Ok(self
            .inner
            .patch_status(
                resource.name()?,
                &self.patch_params().force(),
                &Patch::Apply(&object),
            )
            .await?)
    }
}
