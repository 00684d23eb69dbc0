mod api;
mod client;
mod crd;
mod error;
mod label;
mod meta;
mod rollout;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use k8s_openapi;
pub use kube;

pub use api::Api;
pub use client::{Client, ClientBuilder};
pub use crd::{
    CONDITION_READY, CONDITION_SYNCED, ExperimentDeployment, ExperimentDeploymentSpec,
    ExperimentDeploymentStatus, ExperimentResourceRef, SourceKind, SourceRef,
};
pub use error::{ClientBuildError, Error, Result, json_type_name};
pub use label::{ExpdepLabel, object_labels, pod_template_labels};
pub use meta::{ResourceNameExt, ResourceOwnerRefExt};
pub use rollout::{Rollout, RolloutSpec, RolloutStatus};

pub mod prelude {
    pub use super::{ResourceNameExt, ResourceOwnerRefExt};
    pub use kube::{Resource, ResourceExt};
}
