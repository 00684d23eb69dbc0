//! The three workload kinds an experiment can be derived from, behind one trait.

mod deployment;
mod rollout;
mod statefulset;

use std::fmt::Debug;

use expdep::k8s_openapi::NamespaceResourceScope;
use expdep::k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use expdep::k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use expdep::kube::api::ObjectMeta;
use expdep::kube::{Resource, ResourceExt};
use expdep::{Rollout, SourceKind};
use serde::{Serialize, de::DeserializeOwned};

/// A workload kind the controller can read, derive and write.
pub trait WorkloadKind:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const SOURCE_KIND: SourceKind;

    type Spec: Clone + Default + Debug + Serialize + DeserializeOwned + Send + Sync;

    fn from_parts(metadata: ObjectMeta, spec: Self::Spec) -> Self;

    fn spec(&self) -> Option<&Self::Spec>;

    fn set_spec(&mut self, spec: Self::Spec);

    fn replicas_mut(spec: &mut Self::Spec) -> &mut Option<i32>;

    fn template_meta(spec: &Self::Spec) -> Option<&ObjectMeta>;

    /// Creates the pod template metadata if missing.
    fn template_meta_mut(spec: &mut Self::Spec) -> &mut ObjectMeta;

    fn set_selector(spec: &mut Self::Spec, selector: LabelSelector);

    fn selector(spec: &Self::Spec) -> Option<&LabelSelector>;

    fn observe(&self) -> Observation;

    fn into_any(self) -> AnyWorkload;

    fn from_any(any: AnyWorkload) -> Option<Self>;
}

/// Replica and rollout progress read off a live workload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observation {
    pub generation: Option<i64>,
    /// `None` when the workload controller has not reported one yet.
    pub observed_generation: Option<i64>,
    pub desired_replicas: i32,
    pub ready_replicas: i32,
    pub updated_replicas: i32,
    pub progressing: Option<Progressing>,
    pub message: Option<String>,
}

/// The `Progressing` condition of a Deployment.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Progressing {
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
}

impl Observation {
    pub fn is_ready(&self) -> bool {
        self.ready_replicas >= self.desired_replicas
            && self.updated_replicas == self.desired_replicas
            && self.observed_generation.is_some()
            && self.observed_generation == self.generation
    }
}

/// A concrete workload of any supported kind.
#[derive(Clone, Debug)]
pub enum AnyWorkload {
    Deployment(Deployment),
    StatefulSet(StatefulSet),
    Rollout(Rollout),
}

impl AnyWorkload {
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(workload) => workload.meta(),
            Self::StatefulSet(workload) => workload.meta(),
            Self::Rollout(workload) => workload.meta(),
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Deployment(workload) => workload.name_any(),
            Self::StatefulSet(workload) => workload.name_any(),
            Self::Rollout(workload) => workload.name_any(),
        }
    }

    pub fn observe(&self) -> Observation {
        match self {
            Self::Deployment(workload) => workload.observe(),
            Self::StatefulSet(workload) => workload.observe(),
            Self::Rollout(workload) => workload.observe(),
        }
    }
}
