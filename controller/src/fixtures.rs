use expdep::k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use expdep::{ExperimentDeployment, ExperimentDeploymentSpec, Rollout, SourceRef};
use serde_json::{Value, json};

pub const NAMESPACE: &str = "default";

pub fn experiment(
    kind: &str,
    source: &str,
    replicas: Option<i32>,
    overrides: Value,
) -> ExperimentDeployment {
    let mut experiment = ExperimentDeployment::new(
        "exp",
        ExperimentDeploymentSpec {
            source_ref: SourceRef {
                kind: kind.to_string(),
                name: source.to_string(),
                namespace: None,
            },
            replicas,
            override_spec: overrides,
        },
    );
    experiment.metadata.namespace = Some(NAMESPACE.to_string());
    experiment.metadata.uid = Some("exp-uid".to_string());
    experiment.metadata.generation = Some(1);
    experiment
}

pub fn deployment(name: &str, replicas: i32) -> Deployment {
    serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": {"name": name, "namespace": NAMESPACE, "uid": format!("{name}-uid")},
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {
                    "labels": {"app": name},
                    "annotations": {"prometheus.io/scrape": "true"}
                },
                "spec": {"containers": [{"name": "app", "image": format!("{name}:1.0")}]}
            }
        }
    }))
    .unwrap()
}

pub fn statefulset(name: &str, replicas: i32) -> StatefulSet {
    serde_json::from_value(json!({
        "apiVersion": "apps/v1",
        "kind": "StatefulSet",
        "metadata": {"name": name, "namespace": NAMESPACE, "uid": format!("{name}-uid")},
        "spec": {
            "replicas": replicas,
            "serviceName": "test-service",
            "selector": {"matchLabels": {"app": name}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {"containers": [{"name": "db", "image": format!("{name}:1.0")}]}
            }
        }
    }))
    .unwrap()
}

pub fn rollout(name: &str, replicas: i32) -> Rollout {
    serde_json::from_value(json!({
        "apiVersion": "argoproj.io/v1alpha1",
        "kind": "Rollout",
        "metadata": {"name": name, "namespace": NAMESPACE, "uid": format!("{name}-uid")},
        "spec": {
            "replicas": replicas,
            "selector": {"matchLabels": {"app": name}},
            "strategy": {"canary": {"steps": [{"setWeight": 20}, {"pause": {}}]}},
            "template": {
                "metadata": {"labels": {"app": name}},
                "spec": {"containers": [{"name": "app", "image": format!("{name}:1.0")}]}
            }
        }
    }))
    .unwrap()
}
