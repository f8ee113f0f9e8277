pub mod binance;
pub mod bybit;
pub mod normalize;
pub mod rest;
pub mod signing;

use std::sync::Arc;
use async_trait::async_trait;
use crate::account_infra::{ConnectorKind, Credentials, RawAccountData};
use crate::config::EndpointConfig;
use crate::error::{ConnectionError, FetchError};

pub use binance::BinanceConnector;
pub use bybit::BybitConnector;

/// Capability every account source provides: a handshake probe and a
/// side-effect-free read of balance and positions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountSource: Send + Sync {
    fn kind(&self) -> ConnectorKind;

    /// One-time authenticated probe. Never retried here.
    async fn probe(&self, source_name: &str) -> Result<(), ConnectionError>;

    /// Current balance and raw positions. Must not mutate remote state.
    async fn fetch(&self) -> Result<RawAccountData, FetchError>;
}

/// Construct the concrete adapter for `kind`.
pub fn build_source(
    kind: ConnectorKind,
    credentials: Credentials,
    endpoints: &EndpointConfig,
) -> Arc<dyn AccountSource> {
    match kind {
        ConnectorKind::Binance => Arc::new(BinanceConnector::new(
            credentials,
            &endpoints.binance_url,
            endpoints.recv_window_ms,
        )),
        ConnectorKind::Bybit => Arc::new(BybitConnector::new(
            credentials,
            &endpoints.bybit_url,
            endpoints.recv_window_ms,
        )),
    }
}
