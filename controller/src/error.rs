use expdep::SourceKind;
use expdep::kube::runtime;
use thiserror::Error;

pub type ControllerError<E> = runtime::controller::Error<E, runtime::watcher::Error>;
pub type ControllerResult<T, E> = Result<
    (
        runtime::reflector::ObjectRef<T>,
        runtime::controller::Action,
    ),
    ControllerError<E>,
>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] expdep::Error),
    #[error("overrideSpec must be an object, found {0}")]
    InvalidOverride(&'static str),
    #[error("merged spec is not a valid {kind} spec: {source}")]
    Retype {
        kind: SourceKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("{kind} {name} is already controlled by {owner}")]
    AlreadyOwned {
        kind: SourceKind,
        name: String,
        owner: String,
    },
    #[error("the cluster does not serve argoproj.io/v1alpha1 Rollout")]
    RolloutsNotSupported,
}

impl From<expdep::kube::Error> for Error {
    fn from(err: expdep::kube::Error) -> Self {
        Self::Api(err.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Api(err.into())
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_not_found())
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_conflict())
    }

    /// Errors that retrying cannot fix until the ExperimentDeployment itself changes.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InvalidOverride(_)
                | Self::Retype { .. }
                | Self::RolloutsNotSupported
                | Self::Api(expdep::Error::UnsupportedSourceKind(_))
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
