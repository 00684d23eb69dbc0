//! The mutate step of create-or-update for experiment workloads.

use std::collections::BTreeMap;

use expdep::ExperimentDeployment;
use expdep::k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use expdep::kube::api::ObjectMeta;
use expdep::prelude::*;
use strum::{AsRefStr, Display};

use crate::error::{Error, Result};
use crate::events::reasons;
use crate::workload::WorkloadKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
pub enum UpsertOutcome {
    Created,
    Updated,
    Unchanged,
}

impl UpsertOutcome {
    /// Event reason for outcomes worth reporting.
    pub fn event_reason(self) -> Option<&'static str> {
        match self {
            Self::Created => Some(reasons::CREATED),
            Self::Updated => Some(reasons::UPDATED),
            Self::Unchanged => None,
        }
    }
}

/// Brings `live` in line with `desired`: takes controller ownership, replaces the spec,
/// and merges in the desired labels and annotations.
pub fn apply_desired<K: WorkloadKind>(
    live: &mut K,
    desired: &K,
    owner: &ExperimentDeployment,
) -> Result<()> {
    set_controller_reference::<K>(live.meta_mut(), owner.static_controller_owner_ref()?)?;
    if let Some(spec) = desired.spec() {
        live.set_spec(spec.clone());
    }
    let desired_meta = desired.meta();
    merge_string_map(&mut live.meta_mut().labels, desired_meta.labels.as_ref());
    merge_string_map(
        &mut live.meta_mut().annotations,
        desired_meta.annotations.as_ref(),
    );
    Ok(())
}

fn set_controller_reference<K: WorkloadKind>(
    meta: &mut ObjectMeta,
    owner_ref: OwnerReference,
) -> Result<()> {
    let references = meta.owner_references.get_or_insert_with(Vec::new);
    if let Some(other) = references
        .iter()
        .find(|r| r.controller == Some(true) && r.uid != owner_ref.uid)
    {
        return Err(Error::AlreadyOwned {
            kind: K::SOURCE_KIND,
            name: meta.name.clone().unwrap_or_default(),
            owner: format!("{} {}", other.kind, other.name),
        });
    }
    match references.iter_mut().find(|r| r.uid == owner_ref.uid) {
        Some(existing) => *existing = owner_ref,
        None => references.push(owner_ref),
    }
    Ok(())
}

fn merge_string_map(
    live: &mut Option<BTreeMap<String, String>>,
    desired: Option<&BTreeMap<String, String>>,
) {
    let Some(desired) = desired.filter(|desired| !desired.is_empty()) else {
        return;
    };
    live.get_or_insert_with(BTreeMap::new)
        .extend(desired.iter().map(|(k, v)| (k.clone(), v.clone())));
}
