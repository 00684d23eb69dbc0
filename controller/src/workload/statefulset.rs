use expdep::SourceKind;
use expdep::k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use expdep::k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use expdep::kube::api::ObjectMeta;

use super::{AnyWorkload, Observation, WorkloadKind};

impl WorkloadKind for StatefulSet {
    const SOURCE_KIND: SourceKind = SourceKind::StatefulSet;

    type Spec = StatefulSetSpec;

    fn from_parts(metadata: ObjectMeta, spec: StatefulSetSpec) -> Self {
        StatefulSet {
            metadata,
            spec: Some(spec),
            status: None,
        }
    }

    fn spec(&self) -> Option<&StatefulSetSpec> {
        self.spec.as_ref()
    }

    fn set_spec(&mut self, spec: StatefulSetSpec) {
        self.spec = Some(spec);
    }

    fn replicas_mut(spec: &mut StatefulSetSpec) -> &mut Option<i32> {
        &mut spec.replicas
    }

    fn template_meta(spec: &StatefulSetSpec) -> Option<&ObjectMeta> {
        spec.template.metadata.as_ref()
    }

    fn template_meta_mut(spec: &mut StatefulSetSpec) -> &mut ObjectMeta {
        spec.template.metadata.get_or_insert_with(Default::default)
    }

    fn set_selector(spec: &mut StatefulSetSpec, selector: LabelSelector) {
        spec.selector = selector;
    }

    fn selector(spec: &StatefulSetSpec) -> Option<&LabelSelector> {
        Some(&spec.selector)
    }

    fn observe(&self) -> Observation {
        let status = self.status.clone().unwrap_or_default();
        Observation {
            generation: self.metadata.generation,
            observed_generation: status.observed_generation,
            desired_replicas: self.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1),
            ready_replicas: status.ready_replicas.unwrap_or_default(),
            updated_replicas: status.updated_replicas.unwrap_or_default(),
            progressing: None,
            message: None,
        }
    }

    fn into_any(self) -> AnyWorkload {
        AnyWorkload::StatefulSet(self)
    }

    fn from_any(any: AnyWorkload) -> Option<Self> {
        match any {
            AnyWorkload::StatefulSet(statefulset) => Some(statefulset),
            _ => None,
        }
    }
}
