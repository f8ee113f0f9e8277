use std::time::Duration;
use thiserror::Error;

/// Failure during the one-time handshake of a connector.
///
/// Surfaced synchronously to whoever called `connect`; a connector whose
/// handshake fails is never registered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConnectionError {
    #[error("{source_name}: credentials rejected: {message}")]
    AuthRejected {
        source_name: String,
        message: String,
    },

    #[error("{source_name}: network unreachable: {message}")]
    Unreachable {
        source_name: String,
        message: String,
    },

    #[error("{source_name}: handshake timed out after {after:?}")]
    Timeout {
        source_name: String,
        after: Duration,
    },

    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    #[error("{source_name}: malformed handshake response: {message}")]
    MalformedResponse {
        source_name: String,
        message: String,
    },
}

impl ConnectionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ConnectionError::AuthRejected { .. } => "auth_rejected",
            ConnectionError::Unreachable { .. } => "unreachable",
            ConnectionError::Timeout { .. } => "timeout",
            ConnectionError::MalformedCredentials(_) => "malformed_credentials",
            ConnectionError::MalformedResponse { .. } => "malformed_response",
        }
    }
}

/// Failure of a single polling fetch. Never fatal: the connector keeps its
/// last good data and is retried on the next round.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Connector not connected")]
    NotConnected,
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout(_) => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::Api { .. } => "api",
            FetchError::MalformedResponse(_) => "malformed_response",
            FetchError::NotConnected => "not_connected",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No connector registered under name: {0}")]
    NotFound(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[error("Scheduler operation not allowed in state {from}")]
    InvalidTransition { from: &'static str },

    #[error("Aggregation panicked: {0}")]
    AggregationPanicked(String),

    #[error("Polling worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Invariant violation: {0}")]
    Invariant(InvariantViolation),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Logging setup failed: {0}")]
    LoggingError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    pub invariant: &'static str,
    pub details: String,
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.details)
    }
}

impl From<InvariantViolation> for SchedulerError {
    fn from(violation: InvariantViolation) -> Self {
        SchedulerError::Invariant(violation)
    }
}
