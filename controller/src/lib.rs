mod backoff;
mod capabilities;
mod cluster;
mod config;
mod context;
pub mod controllers;
mod desired;
mod error;
mod events;
mod lifecycle;
mod merge;
mod reconciler;
mod service;
mod status;
mod tracing;
mod upsert;
mod utils;
mod workload;

#[cfg(test)]
mod fixtures;

pub use capabilities::Capabilities;
pub use cluster::{ClusterClient, KubeClusterClient};
pub use config::Config;
pub use context::Context;
pub use error::{ControllerError, ControllerResult, Error, Result};
pub use events::{EventPublisher, KubeEventPublisher};
pub use lifecycle::{FINALIZER, Lifecycle};
pub use merge::{merge, merge_override};
pub use upsert::UpsertOutcome;
pub use utils::ControllerStreamExt;
pub use workload::{AnyWorkload, Observation, WorkloadKind};
