use expdep::prelude::*;

pub const FINALIZER: &str = "experimentdeployments.experimentcontroller.example.com/finalizer";

/// Where an ExperimentDeployment stands with respect to our finalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Not being deleted. The finalizer must be attached before any work happens.
    Active { finalizer_attached: bool },
    /// Deletion requested and our finalizer still blocks it.
    Finalizing,
    /// Deletion requested and our finalizer is gone. Nothing left to do.
    Released,
}

impl Lifecycle {
    pub fn of<R: Resource>(resource: &R, finalizer: &str) -> Self {
        let finalizer_attached = resource.has_finalizer(finalizer);
        match (resource.is_deleting(), finalizer_attached) {
            (false, finalizer_attached) => Self::Active { finalizer_attached },
            (true, true) => Self::Finalizing,
            (true, false) => Self::Released,
        }
    }
}
