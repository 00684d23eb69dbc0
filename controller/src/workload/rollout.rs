use expdep::k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use expdep::kube::api::ObjectMeta;
use expdep::{Rollout, RolloutSpec, SourceKind};

use super::{AnyWorkload, Observation, WorkloadKind};

impl WorkloadKind for Rollout {
    const SOURCE_KIND: SourceKind = SourceKind::Rollout;

    type Spec = RolloutSpec;

    fn from_parts(metadata: ObjectMeta, spec: RolloutSpec) -> Self {
        Rollout {
            metadata,
            spec,
            status: None,
        }
    }

    fn spec(&self) -> Option<&RolloutSpec> {
        Some(&self.spec)
    }

    fn set_spec(&mut self, spec: RolloutSpec) {
        self.spec = spec;
    }

    fn replicas_mut(spec: &mut RolloutSpec) -> &mut Option<i32> {
        &mut spec.replicas
    }

    fn template_meta(spec: &RolloutSpec) -> Option<&ObjectMeta> {
        spec.template.as_ref()?.metadata.as_ref()
    }

    fn template_meta_mut(spec: &mut RolloutSpec) -> &mut ObjectMeta {
        spec.template
            .get_or_insert_with(Default::default)
            .metadata
            .get_or_insert_with(Default::default)
    }

    fn set_selector(spec: &mut RolloutSpec, selector: LabelSelector) {
        spec.selector = Some(selector);
    }

    fn selector(spec: &RolloutSpec) -> Option<&LabelSelector> {
        spec.selector.as_ref()
    }

    fn observe(&self) -> Observation {
        let status = self.status.clone().unwrap_or_default();
        // Legacy Argo releases report a pod-template hash instead of a generation.
        let observed_generation = match status.observed_generation {
            Some(_) => status
                .numeric_observed_generation()
                .or(self.metadata.generation),
            None => None,
        };
        Observation {
            generation: self.metadata.generation,
            observed_generation,
            desired_replicas: self.spec.replicas.unwrap_or(1),
            ready_replicas: status.ready_replicas.unwrap_or_default(),
            updated_replicas: status.updated_replicas.unwrap_or_default(),
            progressing: None,
            message: status.message,
        }
    }

    fn into_any(self) -> AnyWorkload {
        AnyWorkload::Rollout(self)
    }

    fn from_any(any: AnyWorkload) -> Option<Self> {
        match any {
            AnyWorkload::Rollout(rollout) => Some(rollout),
            _ => None,
        }
    }
}
