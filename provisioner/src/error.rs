use crate::models::ResourceKind;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("site {identity} already exists or is being provisioned")]
    AlreadyExists { identity: String },

    #[error("failed to {operation} {kind} {target}: {source}")]
    Kube {
        operation: &'static str,
        kind: ResourceKind,
        target: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to serialize {kind}: {source}")]
    Serialization {
        kind: ResourceKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("created {kind} has no name")]
    MissingName { kind: ResourceKind },

    #[error("deprovisioning {identity} failed: {}", .failures.join("; "))]
    Deprovision {
        identity: String,
        failures: Vec<String>,
    },
}

impl Error {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }

    /// True for errors caused by the caller rather than the cluster.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_) | Error::AlreadyExists { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
