use std::str::FromStr;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use k8s_openapi::chrono::Utc;
use kube::CustomResource;
use schemars::JsonSchema;
use schemars::r#gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::{Error, Result};

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_SYNCED: &str = "Synced";

#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, Default)]
#[kube(
    group = "experimentcontroller.example.com",
    version = "v1alpha1",
    kind = "ExperimentDeployment",
    status = "ExperimentDeploymentStatus",
    shortname = "expdep",
    category = "all",
    namespaced,
    printcolumn = r#"{"name":"Source Kind","type":"string","jsonPath":".spec.sourceRef.kind"}"#,
    printcolumn = r#"{"name":"Source Name","type":"string","jsonPath":".spec.sourceRef.name"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Ready","type":"integer","jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentDeploymentSpec {
    /// The workload the experiment is derived from.
    pub source_ref: SourceRef,
    /// Replica count of the derived workload. Wins over anything in `overrideSpec`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 0))]
    pub replicas: Option<i32>,
    /// Partial workload spec deep-merged onto the source's spec.
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub override_spec: serde_json::Value,
}

fn preserve_unknown_fields(_: &mut SchemaGenerator) -> Schema {
    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.extensions.insert(
        "x-kubernetes-preserve-unknown-fields".to_string(),
        serde_json::Value::Bool(true),
    );
    Schema::Object(schema)
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    /// One of `Deployment`, `StatefulSet` or `Rollout`. Checked at reconcile time.
    pub kind: String,
    pub name: String,
    /// Defaults to the namespace of the owning ExperimentDeployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SourceRef {
    pub fn source_kind(&self) -> Result<SourceKind> {
        SourceKind::from_str(&self.kind)
            .map_err(|_| Error::UnsupportedSourceKind(self.kind.clone()))
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    AsRefStr,
    EnumString,
    Serialize,
    Deserialize,
)]
pub enum SourceKind {
    Deployment,
    StatefulSet,
    Rollout,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentResourceRef {
    pub kind: String,
    pub name: String,
    pub namespace: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentDeploymentStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experiment_resource_ref: Option<ExperimentResourceRef>,
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub ready_replicas: i32,
}

impl ExperimentDeploymentStatus {
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub fn is_ready(&self) -> bool {
        self.condition(CONDITION_READY)
            .is_some_and(|c| c.status == "True")
    }

    /// Upserts a condition by type. The transition time only moves when the status changes.
    pub fn set_condition(
        &mut self,
        type_: &str,
        status: bool,
        reason: &str,
        message: impl Into<String>,
        observed_generation: Option<i64>,
    ) {
        let status = if status { "True" } else { "False" }.to_string();
        let message = message.into();
        match self.conditions.iter_mut().find(|c| c.type_ == type_) {
            Some(existing) => {
                if existing.status != status {
                    existing.last_transition_time = Time(Utc::now());
                }
                existing.status = status;
                existing.reason = reason.to_string();
                existing.message = message;
                existing.observed_generation = observed_generation;
            }
            None => self.conditions.push(Condition {
                type_: type_.to_string(),
                status,
                reason: reason.to_string(),
                message,
                observed_generation,
                last_transition_time: Time(Utc::now()),
            }),
        }
    }
}

impl ExperimentDeployment {
    /// Namespace of the source workload, falling back to the CR's own namespace.
    pub fn source_namespace(&self) -> Result<&str> {
        match self.spec.source_ref.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => Ok(namespace),
            _ => self
                .metadata
                .namespace
                .as_deref()
                .ok_or(Error::ObjectMetaMissing("namespace")),
        }
    }
}
