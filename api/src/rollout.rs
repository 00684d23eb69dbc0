use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::PodTemplateSpec;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// The subset of an Argo Rollout the controller reads and writes. Everything else in the
/// spec is carried through `extra` untouched.
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, Default)]
#[kube(
    group = "argoproj.io",
    version = "v1alpha1",
    kind = "Rollout",
    status = "RolloutStatus",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct RolloutSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PodTemplateSpec>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RolloutStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_replicas: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_replicas: Option<i32>,
    /// Argo reports this as a string. Older releases used a pod-template hash here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RolloutStatus {
    /// The observed generation when it is numeric.
    pub fn numeric_observed_generation(&self) -> Option<i64> {
        self.observed_generation.as_deref()?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_spec_fields_survive() {
        let rollout: Rollout = serde_json::from_value(serde_json::json!({
            "apiVersion": "argoproj.io/v1alpha1",
            "kind": "Rollout",
            "metadata": {"name": "canary", "namespace": "default"},
            "spec": {
                "replicas": 4,
                "strategy": {"canary": {"steps": [{"setWeight": 20}]}},
                "template": {"metadata": {"labels": {"app": "web"}}}
            },
            "status": {"observedGeneration": "7", "readyReplicas": 4}
        }))
        .unwrap();
        assert_eq!(rollout.spec.replicas, Some(4));
        assert!(rollout.spec.extra.contains_key("strategy"));
        let json = serde_json::to_value(&rollout).unwrap();
        assert_eq!(json["spec"]["strategy"]["canary"]["steps"][0]["setWeight"], 20);
        let status = rollout.status.unwrap();
        assert_eq!(status.numeric_observed_generation(), Some(7));
    }

    #[test]
    fn test_hash_observed_generation_is_not_numeric() {
        let status = RolloutStatus {
            observed_generation: Some("6f8b9c7d5".into()),
            ..Default::default()
        };
        assert_eq!(status.numeric_observed_generation(), None);
    }
}
