use std::fmt;
use serde::{Deserialize, Serialize};
use crate::account_infra::{redact, ConnectorKind, Credentials};
use crate::error::{ConnectionError, Error, Result};

/// Persisted description of one account: the fields a settings layer
/// must round-trip.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountConfig {
    pub name: String,
    pub kind: ConnectorKind,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default)]
    pub auto_connect: bool,
}

impl AccountConfig {
    pub fn credentials(&self) -> std::result::Result<Credentials, ConnectionError> {
        Credentials::new(&self.api_key, &self.api_secret)
    }
}

impl fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountConfig")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &"********")
            .field("auto_connect", &self.auto_connect)
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct AccountSettings {
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl AccountSettings {
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::SerializationError(e.to_string()))
    }

    pub fn from_toml(input: &str) -> Result<Self> {
        toml::from_str(input).map_err(|e| Error::SerializationError(e.to_string()))
    }

    /// Insert or replace the entry with the same name.
    pub fn upsert(&mut self, account: AccountConfig) {
        match self.accounts.iter_mut().find(|a| a.name == account.name) {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
    }
}
