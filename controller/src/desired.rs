//! Builds the experiment workload from its source and the ExperimentDeployment.

use expdep::k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use expdep::kube::api::ObjectMeta;
use expdep::prelude::*;
use expdep::{ExperimentDeployment, object_labels, pod_template_labels};

use crate::error::{Error, Result};
use crate::merge::merge_override;
use crate::workload::WorkloadKind;

pub fn build_desired<K: WorkloadKind>(experiment: &ExperimentDeployment, source: &K) -> Result<K> {
    let name = experiment.name()?;
    let namespace = experiment.require_namespace()?;
    let source_spec = serde_json::to_value(source.spec().cloned().unwrap_or_default())?;
    let merged = merge_override(&source_spec, &experiment.spec.override_spec)?;
    let mut spec: K::Spec = serde_json::from_value(merged).map_err(|source| Error::Retype {
        kind: K::SOURCE_KIND,
        source,
    })?;

    let replicas = K::replicas_mut(&mut spec);
    *replicas = experiment.spec.replicas.or(*replicas).or(Some(1));

    let source_template = source.spec().and_then(K::template_meta);
    let mut labels = source_template
        .and_then(|meta| meta.labels.clone())
        .unwrap_or_default();
    labels.extend(pod_template_labels(
        name,
        K::SOURCE_KIND,
        source.name()?,
    ));
    let annotations = source_template
        .and_then(|meta| meta.annotations.clone())
        .filter(|annotations| !annotations.is_empty());

    let template = K::template_meta_mut(&mut spec);
    template.labels = Some(labels.clone());
    template.annotations = annotations;
    K::set_selector(
        &mut spec,
        LabelSelector {
            match_labels: Some(labels),
            match_expressions: None,
        },
    );

    let metadata = ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(object_labels(name)),
        ..Default::default()
    };
    Ok(K::from_parts(metadata, spec))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use expdep::k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
    use expdep::{ExpdepLabel, Rollout};
    use proptest::prelude::*;
    use serde_json::{Value, json};

    use super::*;
    use crate::fixtures::{self, NAMESPACE};

    fn template_labels<K: WorkloadKind>(workload: &K) -> BTreeMap<String, String> {
        workload
            .spec()
            .and_then(K::template_meta)
            .and_then(|meta| meta.labels.clone())
            .unwrap_or_default()
    }

    fn assert_selector_matches_template<K: WorkloadKind>(workload: &K) {
        let spec = workload.spec().unwrap();
        let selector = K::selector(spec).unwrap();
        assert_eq!(selector.match_expressions, None);
        assert_eq!(
            selector.match_labels.clone().unwrap_or_default(),
            template_labels(workload)
        );
    }

    #[test]
    fn test_deployment_image_override() {
        let experiment = fixtures::experiment(
            "Deployment",
            "web",
            Some(1),
            json!({"template": {"spec": {"containers": [{"name": "app", "image": "web:2.0"}]}}}),
        );
        let desired = build_desired(&experiment, &fixtures::deployment("web", 3)).unwrap();

        assert_eq!(desired.metadata.name.as_deref(), Some("exp"));
        assert_eq!(desired.metadata.namespace.as_deref(), Some(NAMESPACE));
        let spec = desired.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(1));
        let pod_spec = spec.template.spec.as_ref().unwrap();
        assert_eq!(pod_spec.containers.len(), 1);
        assert_eq!(pod_spec.containers[0].image.as_deref(), Some("web:2.0"));

        let labels = template_labels(&desired);
        assert_eq!(labels.len(), 4);
        assert_eq!(labels["app"], "web");
        assert_eq!(labels[&ExpdepLabel::CR_NAME.to_string()], "exp");
        assert_eq!(labels[&ExpdepLabel::ROLE.to_string()], "experiment");
        assert_eq!(
            labels[&ExpdepLabel::source_name(Deployment::SOURCE_KIND).to_string()],
            "web"
        );
        assert_selector_matches_template(&desired);

        let template_annotations = spec.template.metadata.as_ref().unwrap().annotations.clone();
        assert_eq!(
            template_annotations.unwrap()["prometheus.io/scrape"],
            "true"
        );
        let object_labels = desired.metadata.labels.clone().unwrap();
        assert_eq!(object_labels.len(), 2);
        assert_eq!(
            object_labels[&ExpdepLabel::MANAGED_BY.to_string()],
            "experiment-controller"
        );
        assert_eq!(desired.metadata.annotations, None);
        assert_eq!(desired.metadata.owner_references, None);
    }

    #[test]
    fn test_statefulset_env_override_keeps_service_name() {
        let experiment = fixtures::experiment(
            "StatefulSet",
            "db",
            None,
            json!({"template": {"spec": {"containers": [{
                "name": "db",
                "image": "db:1.0",
                "env": [{"name": "EXPERIMENT_MODE", "value": "true"}]
            }]}}}),
        );
        let desired = build_desired(&experiment, &fixtures::statefulset("db", 2)).unwrap();
        let spec = serde_json::to_value(desired.spec.as_ref().unwrap()).unwrap();
        assert_eq!(spec["serviceName"], "test-service");
        assert_eq!(spec["replicas"], 2);
        assert_eq!(
            spec["template"]["spec"]["containers"][0]["env"][0]["name"],
            "EXPERIMENT_MODE"
        );
        assert_eq!(
            template_labels(&desired)[&ExpdepLabel::source_name(StatefulSet::SOURCE_KIND).to_string()],
            "db"
        );
        assert_selector_matches_template(&desired);
    }

    #[test]
    fn test_rollout_keeps_strategy() {
        let experiment = fixtures::experiment(
            "Rollout",
            "canary",
            Some(2),
            json!({"template": {"spec": {"containers": [{"name": "app", "image": "canary:2.0"}]}}}),
        );
        let desired = build_desired(&experiment, &fixtures::rollout("canary", 5)).unwrap();
        assert_eq!(desired.spec.replicas, Some(2));
        assert_eq!(
            desired.spec.extra["strategy"]["canary"]["steps"][0]["setWeight"],
            20
        );
        assert_selector_matches_template(&desired);
    }

    #[test]
    fn test_replica_precedence() {
        let source = fixtures::deployment("web", 3);
        let replicas = |cr: Option<i32>, overrides: Value| {
            let experiment = fixtures::experiment("Deployment", "web", cr, overrides);
            build_desired(&experiment, &source)
                .unwrap()
                .spec
                .unwrap()
                .replicas
        };
        assert_eq!(replicas(Some(1), json!({"replicas": 5})), Some(1));
        assert_eq!(replicas(Some(0), json!({"replicas": 5})), Some(0));
        assert_eq!(replicas(None, json!({"replicas": 5})), Some(5));
        assert_eq!(replicas(None, json!({})), Some(3));
        assert_eq!(replicas(None, json!({"replicas": null})), Some(1));
    }

    #[test]
    fn test_container_list_is_replaced_wholesale() {
        let mut source = fixtures::deployment("web", 3);
        let mut spec = serde_json::to_value(source.spec.as_ref().unwrap()).unwrap();
        spec["template"]["spec"]["containers"] = json!([
            {"name": "app", "image": "web:1.0"},
            {"name": "sidecar", "image": "proxy:1.0"}
        ]);
        source.spec = Some(serde_json::from_value(spec).unwrap());
        let experiment = fixtures::experiment(
            "Deployment",
            "web",
            None,
            json!({"template": {"spec": {"containers": [{"name": "app", "image": "web:2.0"}]}}}),
        );
        let desired = build_desired(&experiment, &source).unwrap();
        let containers = &desired.spec.unwrap().template.spec.unwrap().containers;
        assert_eq!(containers.len(), 1);
        assert_eq!(containers[0].name, "app");
        assert_eq!(containers[0].image.as_deref(), Some("web:2.0"));
    }

    #[test]
    fn test_untypable_merge_is_terminal() {
        let experiment =
            fixtures::experiment("Deployment", "web", None, json!({"replicas": "x"}));
        let err = build_desired(&experiment, &fixtures::deployment("web", 3)).unwrap_err();
        assert!(matches!(err, Error::Retype { .. }));
        assert!(err.is_terminal());
    }

    #[test]
    fn test_malformed_override_is_terminal() {
        let experiment = fixtures::experiment("Deployment", "web", None, json!(["x"]));
        let err = build_desired(&experiment, &fixtures::deployment("web", 3)).unwrap_err();
        assert!(matches!(err, Error::InvalidOverride("array")));
    }

    fn with_labels<K: WorkloadKind>(mut source: K, labels: &BTreeMap<String, String>) -> K {
        if let Some(mut spec) = source.spec().cloned() {
            K::template_meta_mut(&mut spec).labels = Some(labels.clone());
            source.set_spec(spec);
        }
        source
    }

    proptest! {
        #[test]
        fn selector_equals_template_labels(
            labels in prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..6),
            replicas in prop::option::of(0i32..10),
            image in "[a-z]{1,8}",
        ) {
            let overrides = json!({"template": {"spec": {"containers": [{"name": "app", "image": image}]}}});
            let deployment = build_desired::<Deployment>(
                &fixtures::experiment("Deployment", "web", replicas, overrides.clone()),
                &with_labels(fixtures::deployment("web", 3), &labels),
            ).unwrap();
            let statefulset = build_desired::<StatefulSet>(
                &fixtures::experiment("StatefulSet", "db", replicas, overrides.clone()),
                &with_labels(fixtures::statefulset("db", 3), &labels),
            ).unwrap();
            let rollout = build_desired::<Rollout>(
                &fixtures::experiment("Rollout", "canary", replicas, overrides),
                &with_labels(fixtures::rollout("canary", 3), &labels),
            ).unwrap();
            assert_selector_matches_template(&deployment);
            assert_selector_matches_template(&statefulset);
            assert_selector_matches_template(&rollout);
            let deployment_labels = template_labels(&deployment);
            for (key, value) in &labels {
                prop_assert_eq!(deployment_labels.get(key), Some(value));
            }
            prop_assert_eq!(deployment.spec.unwrap().replicas, Some(replicas.unwrap_or(3)));
        }
    }
}
