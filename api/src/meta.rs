use crate::{Error, Result};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;

pub trait ResourceNameExt: Resource {
    fn name(&self) -> Result<&str> {
        self.meta()
            .name
            .as_deref()
            .ok_or(Error::ObjectMetaMissing("name"))
    }

    fn require_namespace(&self) -> Result<&str> {
        self.meta()
            .namespace
            .as_deref()
            .ok_or(Error::ObjectMetaMissing("namespace"))
    }

    fn has_finalizer(&self, finalizer: &str) -> bool {
        self.meta()
            .finalizers
            .as_ref()
            .is_some_and(|finalizers| finalizers.iter().any(|f| f == finalizer))
    }

    fn is_deleting(&self) -> bool {
        self.meta().deletion_timestamp.is_some()
    }
}

impl<T> ResourceNameExt for T where T: Resource {}

pub trait ResourceOwnerRefExt: Resource<DynamicType = ()> {
    fn static_controller_owner_ref(&self) -> Result<OwnerReference> {
        self.controller_owner_ref(&())
            .ok_or(Error::ObjectMetaMissing("controller_owner_ref"))
    }
}

impl<T> ResourceOwnerRefExt for T where T: Resource<DynamicType = ()> {}
