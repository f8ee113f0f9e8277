use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::Instrument;
use crate::account_infra::connectors::normalize::normalize_account;
use crate::account_infra::connectors::{build_source, AccountSource};
use crate::account_infra::{AccountData, ConnectionState, ConnectorKind, Credentials};
use crate::config::EndpointConfig;
use crate::error::{ConnectionError, FetchError};
use crate::observability::tracing::trace_connect;
use crate::types::{AccountBalance, Position, Timestamp};

/// Last successfully fetched account data. Only replaced on a successful fetch.
#[derive(Clone, Debug, Default, PartialEq)]
struct CachedAccount {
    balance: AccountBalance,
    positions: Vec<Position>,
    last_fetch_at: Option<Timestamp>,
}

/// Point-in-time copy of one connector's state and cached data.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConnectorStatus {
    pub name: String,
    pub kind: ConnectorKind,
    pub state: ConnectionState,
    pub balance: AccountBalance,
    pub positions: Vec<Position>,
    pub last_fetch_at: Option<Timestamp>,
}

/// One external account: identity, connection state and last good data.
pub struct Connector {
    name: String,
    kind: ConnectorKind,
    source: Arc<dyn AccountSource>,
    state: RwLock<ConnectionState>,
    cache: RwLock<CachedAccount>,
}

impl Connector {
    pub fn new(name: impl Into<String>, source: Arc<dyn AccountSource>) -> Self {
        Connector {
            name: name.into(),
            kind: source.kind(),
            source,
            state: RwLock::new(ConnectionState::Disconnected),
            cache: RwLock::new(CachedAccount::default()),
        }
    }

    pub fn from_kind(
        name: impl Into<String>,
        kind: ConnectorKind,
        credentials: Credentials,
        endpoints: &EndpointConfig,
    ) -> Self {
        Connector::new(name, build_source(kind, credentials, endpoints))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ConnectorKind {
        self.kind
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Run the handshake probe once, bounded by `timeout`.
    pub async fn connect(&self, timeout: Duration) -> Result<(), ConnectionError> {
        *self.state.write().await = ConnectionState::Connecting;

        let outcome = match tokio::time::timeout(timeout, self.source.probe(&self.name))
            .instrument(trace_connect(&self.name))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout {
                source_name: self.name.clone(),
                after: timeout,
            }),
        };

        let next = if outcome.is_ok() { ConnectionState::Connected } else { ConnectionState::Failed };
        *self.state.write().await = next;
        outcome
    }

    pub async fn disconnect(&self) {
        let mut state = self.state.write().await;
        if *state != ConnectionState::Disconnected {
            tracing::info!(source = %self.name, kind = %self.kind, "Connector disconnected");
        }
        *state = ConnectionState::Disconnected;
    }

    /// Pull and normalize one round of data. Leaves the cached values alone;
    /// the scheduler commits successful results through `apply_fetch`.
    pub async fn fetch(&self) -> Result<AccountData, FetchError> {
        if !self.is_connected().await {
            return Err(FetchError::NotConnected);
        }

        let raw = self.source.fetch().await?;
        normalize_account(&self.name, raw)
    }

    pub(crate) async fn apply_fetch(&self, data: AccountData, fetched_at: Timestamp) {
        let mut cache = self.cache.write().await;
        cache.balance = data.balance;
        cache.positions = data.positions;
        cache.last_fetch_at = Some(fetched_at);
    }

    pub async fn status(&self) -> ConnectorStatus {
        let state = self.state().await;
        let cache = self.cache.read().await.clone();
        ConnectorStatus {
            name: self.name.clone(),
            kind: self.kind,
            state,
            balance: cache.balance,
            positions: cache.positions,
            last_fetch_at: cache.last_fetch_at,
        }
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
