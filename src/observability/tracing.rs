use tracing::Span;
use tracing_subscriber::EnvFilter;
use crate::config::LoggingConfig;
use crate::error::{Error, Result};

pub fn trace_round(round: u64) -> Span {
    tracing::info_span!(
        "polling_round",
        round = round,
    )
}

pub fn trace_fetch(source: &str) -> Span {
    tracing::debug_span!(
        "fetch",
        source = %source,
    )
}

pub fn trace_connect(source: &str) -> Span {
    tracing::info_span!(
        "connect",
        source = %source,
    )
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::LoggingError(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::LoggingError(e.to_string()))
}
