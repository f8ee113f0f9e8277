use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use crate::account_infra::aggregator::AggregatedSnapshot;
use crate::account_infra::connector::Connector;
use crate::account_infra::{ConnectionState, ConnectorKind, Credentials};
use crate::config::{AccountConfig, AppConfig, EndpointConfig};
use crate::error::{ConnectionError, Error, RegistryError, Result, SchedulerError};
use crate::feed::publisher::{SnapshotPublisher, SnapshotSlot};
use crate::feed::registry::ConnectorRegistry;
use crate::feed::scheduler::{PollingScheduler, SchedulerState};
use crate::interfaces::{FailureReport, FailureSink, TracingFailureSink};
use crate::observability::metrics::CONNECT_FAILURES;

/// Registered connector as seen by a settings layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectorEntry {
    pub name: String,
    pub kind: ConnectorKind,
    pub state: ConnectionState,
}

/// Outcome of connecting one configured account at startup.
#[derive(Debug)]
pub struct BootstrapOutcome {
    pub name: String,
    pub result: std::result::Result<(), ConnectionError>,
}

/// Control and display boundary over the registry, scheduler and publisher.
pub struct AccountFeed {
    registry: Arc<ConnectorRegistry>,
    publisher: Arc<SnapshotPublisher>,
    scheduler: PollingScheduler,
    sink: Arc<dyn FailureSink>,
    endpoints: EndpointConfig,
    connect_timeout: Duration,
}

impl AccountFeed {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingFailureSink))
    }

    pub fn with_sink(config: &AppConfig, sink: Arc<dyn FailureSink>) -> Self {
        let registry = Arc::new(ConnectorRegistry::new());
        let publisher = Arc::new(SnapshotPublisher::new());
        let scheduler = PollingScheduler::new(
            Arc::clone(&registry),
            Arc::clone(&publisher),
            Arc::clone(&sink),
            config.scheduler.clone(),
        );

        AccountFeed {
            registry,
            publisher,
            scheduler,
            sink,
            endpoints: config.endpoints.clone(),
            connect_timeout: config.scheduler.connect_timeout(),
        }
    }

    /// Build the adapter for `kind`, run its handshake and register it on
    /// success. A connector that fails to connect is reported and never
    /// enters the registry.
    pub async fn register_connector(
        &self,
        name: &str,
        credentials: Credentials,
        kind: ConnectorKind,
    ) -> std::result::Result<Arc<Connector>, ConnectionError> {
        let connector = Connector::from_kind(name, kind, credentials, &self.endpoints);
        self.register(connector).await
    }

    /// Connect and register an already-built connector.
    pub async fn register(
        &self,
        connector: Connector,
    ) -> std::result::Result<Arc<Connector>, ConnectionError> {
        if let Err(err) = connector.connect(self.connect_timeout).await {
            self.report_connect_failure(connector.name(), &err);
            return Err(err);
        }

        let connector = Arc::new(connector);
        info!(source = connector.name(), kind = %connector.kind(), "Connector connected");
        if let Some(replaced) = self.registry.add(Arc::clone(&connector)).await {
            replaced.disconnect().await;
        }
        Ok(connector)
    }

    /// Remove the named connector and mark it disconnected. It contributes
    /// nothing from the next round on.
    pub async fn deregister_connector(&self, name: &str) -> std::result::Result<(), RegistryError> {
        let removed = self.registry.remove(name).await?;
        removed.disconnect().await;
        Ok(())
    }

    pub async fn disconnect_all(&self) -> usize {
        self.registry.clear().await
    }

    /// Re-run the handshake for a registered connector. Never automatic.
    pub async fn reconnect(&self, name: &str) -> Result<()> {
        let connector = self
            .registry
            .get(name)
            .await
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        connector.connect(self.connect_timeout).await.map_err(|err| {
            self.report_connect_failure(name, &err);
            Error::from(err)
        })?;

        info!(source = name, "Connector reconnected");
        Ok(())
    }

    /// Connect every account flagged `auto_connect`, in order.
    pub async fn bootstrap(&self, accounts: &[AccountConfig]) -> Vec<BootstrapOutcome> {
        let mut outcomes = Vec::new();
        for account in accounts.iter().filter(|a| a.auto_connect) {
            let result = match account.credentials() {
                Ok(credentials) => self
                    .register_connector(&account.name, credentials, account.kind)
                    .await
                    .map(|_| ()),
                Err(err) => {
                    self.report_connect_failure(&account.name, &err);
                    Err(err)
                }
            };
            outcomes.push(BootstrapOutcome { name: account.name.clone(), result });
        }

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(failed, total = outcomes.len(), "Some accounts failed to connect at startup");
        }
        outcomes
    }

    pub async fn connector_states(&self) -> Vec<ConnectorEntry> {
        let mut entries = Vec::new();
        for connector in self.registry.snapshot().await.iter() {
            entries.push(ConnectorEntry {
                name: connector.name().to_string(),
                kind: connector.kind(),
                state: connector.state().await,
            });
        }
        entries
    }

    pub fn latest(&self) -> SnapshotSlot {
        self.publisher.latest()
    }

    pub fn subscribe(&self) -> watch::Receiver<SnapshotSlot> {
        self.publisher.subscribe()
    }

    pub fn updates(&self) -> impl futures::Stream<Item = Arc<AggregatedSnapshot>> + use<> {
        self.publisher.updates()
    }

    pub async fn start(&self) -> std::result::Result<(), SchedulerError> {
        self.scheduler.start().await
    }

    /// Stop polling, wait for the worker to exit, then disconnect every
    /// connector.
    pub async fn shutdown(&self) -> std::result::Result<(), SchedulerError> {
        let stopped = self.scheduler.stop().await;
        let disconnected = self.registry.clear().await;
        info!(disconnected, "Account feed shut down");
        stopped
    }

    pub async fn poll_once(&self) -> std::result::Result<Arc<AggregatedSnapshot>, SchedulerError> {
        self.scheduler.poll_once().await
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.scheduler.subscribe_state()
    }

    /// Resolves once the scheduler reaches `Stopped`, with the error that
    /// stopped it if the worker died on its own.
    pub async fn stopped(&self) -> Option<SchedulerError> {
        let mut state = self.scheduler.subscribe_state();
        state.wait_for(|s| *s == SchedulerState::Stopped).await.ok();
        self.scheduler.fatal_error()
    }

    pub async fn check_health(&self) -> std::result::Result<(), SchedulerError> {
        self.scheduler.check_health().await
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    fn report_connect_failure(&self, name: &str, err: &ConnectionError) {
        CONNECT_FAILURES.inc();
        self.sink.report(&FailureReport::connect(name, err));
    }
}
