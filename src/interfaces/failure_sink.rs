use std::fmt;
use crate::error::{ConnectionError, FetchError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureStage {
    Connect,
    Fetch,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureStage::Connect => write!(f, "connect"),
            FailureStage::Fetch => write!(f, "fetch"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FailureReport {
    pub source: String,
    pub stage: FailureStage,
    pub kind: &'static str,
    pub message: String,
}

impl FailureReport {
    pub fn connect(source: &str, error: &ConnectionError) -> Self {
        FailureReport {
            source: source.to_string(),
            stage: FailureStage::Connect,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn fetch(source: &str, error: &FetchError) -> Self {
        FailureReport {
            source: source.to_string(),
            stage: FailureStage::Fetch,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Receives every connect and fetch failure. Storage is up to the implementor.
pub trait FailureSink: Send + Sync {
    fn report(&self, failure: &FailureReport);
}

/// Default sink: structured `tracing` events.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn report(&self, failure: &FailureReport) {
        match failure.stage {
            FailureStage::Connect => tracing::error!(
                source = %failure.source,
                kind = failure.kind,
                "Connect failed: {}",
                failure.message
            ),
            // A single bad fetch is expected now and then
            FailureStage::Fetch => tracing::warn!(
                source = %failure.source,
                kind = failure.kind,
                "Fetch failed: {}",
                failure.message
            ),
        }
    }
}
