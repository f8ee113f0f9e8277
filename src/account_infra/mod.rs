pub mod aggregator;
pub mod connector;
pub mod connectors;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use crate::error::ConnectionError;
use crate::types::{AccountBalance, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of supported account sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    Binance,
    Bybit,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 2] = [ConnectorKind::Binance, ConnectorKind::Bybit];
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectorKind::Binance => write!(f, "Binance"),
            ConnectorKind::Bybit => write!(f, "Bybit"),
        }
    }
}

impl FromStr for ConnectorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "binance" => Ok(ConnectorKind::Binance),
            "bybit" => Ok(ConnectorKind::Bybit),
            other => Err(format!("unknown connector kind: {}", other)),
        }
    }
}

/// API key pair for one account. The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: &str, api_secret: &str) -> Result<Self, ConnectionError> {
        let api_key = api_key.trim();
        let api_secret = api_secret.trim();

        if api_key.is_empty() || api_secret.is_empty() {
            return Err(ConnectionError::MalformedCredentials(
                "API key and secret cannot be empty".to_string(),
            ));
        }

        Ok(Credentials {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub(crate) fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &"********")
            .finish()
    }
}

/// Keep the first four characters of a key so operators can tell accounts apart.
pub(crate) fn redact(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{}****", visible)
}

/// Position as reported by a source, before side/quantity normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPosition {
    pub symbol: String,
    pub side_token: Option<String>,
    pub quantity: f64,  // Signed or magnitude, depending on the source
    pub entry_price: f64,
    pub mark_price: f64,
    pub unrealized_pnl: f64,
}

/// One round of account data exactly as a source returned it.
#[derive(Clone, Debug, PartialEq)]
pub struct RawAccountData {
    pub balance: AccountBalance,
    pub positions: Vec<RawPosition>,
}

/// Normalized result of one successful fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountData {
    pub balance: AccountBalance,
    pub positions: Vec<Position>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_trimmed() {
        let creds = Credentials::new("  key123  ", "\tsecret\n").unwrap();
        assert_eq!(creds.api_key(), "key123");
        assert_eq!(creds.api_secret(), "secret");
    }

    #[test]
    fn empty_credentials_are_malformed() {
        let err = Credentials::new("key", "   ").unwrap_err();
        assert_eq!(err.kind(), "malformed_credentials");
        assert!(Credentials::new("", "secret").is_err());
    }

    #[test]
    fn debug_never_shows_secret() {
        let creds = Credentials::new("abcdefgh", "topsecretvalue").unwrap();
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("topsecretvalue"));
        assert!(!rendered.contains("abcdefgh"));
        assert!(rendered.contains("abcd****"));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Binance".parse::<ConnectorKind>().unwrap(), ConnectorKind::Binance);
        assert_eq!(" BYBIT ".parse::<ConnectorKind>().unwrap(), ConnectorKind::Bybit);
        assert!("kraken".parse::<ConnectorKind>().is_err());
    }

    #[test]
    fn kind_serializes_lowercase() {
        let json = serde_json::to_string(&ConnectorKind::Bybit).unwrap();
        assert_eq!(json, "\"bybit\"");
    }
}
