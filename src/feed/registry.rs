use std::sync::Arc;
use tokio::sync::RwLock;
use crate::account_infra::connector::Connector;
use crate::error::RegistryError;

/// Owner of the active connectors, at most one per source name.
///
/// Mutations and enumeration are mutually exclusive. Enumeration hands out a
/// persistent-vector copy, so the lock is never held across a network call.
pub struct ConnectorRegistry {
    connectors: RwLock<im::Vector<Arc<Connector>>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        ConnectorRegistry {
            connectors: RwLock::new(im::Vector::new()),
        }
    }

    /// Insert `connector`, replacing any entry with the same name in place.
    /// The replaced connector is returned for the caller to disconnect.
    pub async fn add(&self, connector: Arc<Connector>) -> Option<Arc<Connector>> {
        let mut connectors = self.connectors.write().await;
        match connectors.iter().position(|c| c.name() == connector.name()) {
            Some(index) => {
                let previous = connectors.set(index, connector);
                tracing::info!(source = previous.name(), "Replaced connector");
                Some(previous)
            }
            None => {
                tracing::info!(source = connector.name(), kind = %connector.kind(), "Registered connector");
                connectors.push_back(connector);
                None
            }
        }
    }

    /// Detach the named connector. Disconnecting it is up to the caller.
    pub async fn remove(&self, name: &str) -> Result<Arc<Connector>, RegistryError> {
        let mut connectors = self.connectors.write().await;
        let index = connectors
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let removed = connectors.remove(index);
        tracing::info!(source = name, "Deregistered connector");
        Ok(removed)
    }

    /// Remove and disconnect every connector.
    pub async fn clear(&self) -> usize {
        let drained = std::mem::take(&mut *self.connectors.write().await);
        for connector in drained.iter() {
            connector.disconnect().await;
        }
        drained.len()
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Connector>> {
        self.connectors
            .read()
            .await
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Consistent copy of the current set, in registration order.
    pub async fn snapshot(&self) -> im::Vector<Arc<Connector>> {
        self.connectors.read().await.clone()
    }

    pub async fn names(&self) -> Vec<String> {
        self.connectors
            .read()
            .await
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.connectors.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connectors.read().await.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
