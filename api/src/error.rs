use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Object metadata is missing: {0}")]
    ObjectMetaMissing(&'static str),
    #[error(
        "unsupported source kind '{0}', supported kinds are: Deployment, StatefulSet, Rollout"
    )]
    UnsupportedSourceKind(String),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Kube(#[from] kube::Error),
    #[error("Expected a value of type {0} but found {1}")]
    ExpectedType(&'static str, &'static str),
    #[error(transparent)]
    ClientBuildError(#[from] ClientBuildError),
}

impl Error {
    pub fn expected_json_type(expected: &'static str, found: &serde_json::Value) -> Self {
        Self::ExpectedType(expected, json_type_name(found))
    }

    fn api_code(&self) -> Option<u16> {
        match self {
            Self::Kube(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }
}

pub fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientBuildError {
    #[error(transparent)]
    Config(#[from] kube::config::InferConfigError),
    #[error(transparent)]
    Kube(#[from] kube::Error),
}
