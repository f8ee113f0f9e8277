use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};
use crate::account_infra::aggregator::{AccountAggregator, AggregatedSnapshot};
use crate::account_infra::connector::Connector;
use crate::account_infra::AccountData;
use crate::config::SchedulerConfig;
use crate::error::{FetchError, SchedulerError};
use crate::feed::publisher::SnapshotPublisher;
use crate::feed::registry::ConnectorRegistry;
use crate::interfaces::{FailureReport, FailureSink};
use crate::observability::metrics::{
    CONNECTED_SOURCES, FETCH_FAILURES, FETCH_TIMEOUTS, ROUNDS_ABANDONED, ROUNDS_COMPLETED,
    ROUND_LATENCY,
};
use crate::observability::tracing::{trace_fetch, trace_round};
use crate::types::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

impl SchedulerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Running => "running",
            SchedulerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connectors enumerated for one round and the fetch result of each
/// connected one, by index into `connectors`.
struct RoundFetch {
    connectors: Vec<Arc<Connector>>,
    results: Vec<(usize, Result<AccountData, FetchError>)>,
}

/// State shared between the scheduler handle and its background task.
struct RoundRunner {
    registry: Arc<ConnectorRegistry>,
    publisher: Arc<SnapshotPublisher>,
    sink: Arc<dyn FailureSink>,
    aggregator: AccountAggregator,
    config: SchedulerConfig,
    rounds: AtomicU64,
    round_lock: Mutex<()>,
    state: watch::Sender<SchedulerState>,
    fatal: watch::Sender<Option<SchedulerError>>,
}

/// Background polling loop: Idle -> Running -> Stopped.
///
/// Each round fetches every connected source concurrently, each bounded by
/// `fetch_timeout`, aggregates the fresh results over the cached ones, and
/// only then commits them to the connectors' caches and publishes. Rounds
/// never overlap: the worker and `poll_once` share one round lock. The wait
/// of `poll_interval` starts when the previous round ends.
pub struct PollingScheduler {
    runner: Arc<RoundRunner>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PollingScheduler {
    pub fn new(
        registry: Arc<ConnectorRegistry>,
        publisher: Arc<SnapshotPublisher>,
        sink: Arc<dyn FailureSink>,
        config: SchedulerConfig,
    ) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        let (fatal, _) = watch::channel(None);
        let (shutdown, _) = watch::channel(false);

        PollingScheduler {
            runner: Arc::new(RoundRunner {
                registry,
                publisher,
                sink,
                aggregator: AccountAggregator::new(config.stale_after()),
                config,
                rounds: AtomicU64::new(0),
                round_lock: Mutex::new(()),
                state,
                fatal,
            }),
            shutdown,
            worker: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SchedulerState {
        *self.runner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.runner.state.subscribe()
    }

    /// Terminal error that stopped the worker, if any.
    pub fn fatal_error(&self) -> Option<SchedulerError> {
        self.runner.fatal.borrow().clone()
    }

    pub fn rounds_completed(&self) -> u64 {
        self.runner.rounds.load(Ordering::SeqCst)
    }

    /// Spawn the polling worker. Only valid from `Idle`.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut worker = self.worker.lock().await;

        let mut started = false;
        self.runner.state.send_if_modified(|state| {
            if *state == SchedulerState::Idle {
                *state = SchedulerState::Running;
                started = true;
            }
            started
        });

        if !started {
            return Err(SchedulerError::InvalidTransition { from: self.state().as_str() });
        }

        let runner = Arc::clone(&self.runner);
        let shutdown = self.shutdown.subscribe();
        *worker = Some(tokio::spawn(async move { runner.run(shutdown).await }));

        info!(
            poll_interval_ms = self.runner.config.poll_interval_ms,
            fetch_timeout_ms = self.runner.config.fetch_timeout_ms,
            "Polling scheduler started"
        );
        Ok(())
    }

    /// Signal shutdown and wait for the worker to exit. Safe to call more
    /// than once; every call reports the terminal error, if there was one.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let mut worker = self.worker.lock().await;
        self.shutdown.send_replace(true);

        if let Some(handle) = worker.take() {
            if let Err(join_error) = handle.await {
                let err = SchedulerError::WorkerPanicked(join_error.to_string());
                error!("Polling worker terminated abnormally: {}", err);
                self.runner.fatal.send_replace(Some(err));
            }
            info!("Polling scheduler stopped");
        }
        self.runner.state.send_replace(SchedulerState::Stopped);

        match self.fatal_error() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Err if the worker has died on its own while it should be running.
    pub async fn check_health(&self) -> Result<(), SchedulerError> {
        if let Some(err) = self.fatal_error() {
            return Err(err);
        }

        let worker = self.worker.lock().await;
        let exited = worker.as_ref().is_some_and(|handle| handle.is_finished());
        if exited && self.state() == SchedulerState::Running {
            return Err(SchedulerError::WorkerPanicked(
                "polling worker exited unexpectedly".to_string(),
            ));
        }
        Ok(())
    }

    /// Run a single round right now. Waits for an in-flight worker round to
    /// finish first; refused once the scheduler has stopped.
    pub async fn poll_once(&self) -> Result<Arc<AggregatedSnapshot>, SchedulerError> {
        let _round = self.runner.round_lock.lock().await;
        let state = self.state();
        if state == SchedulerState::Stopped {
            return Err(SchedulerError::InvalidTransition { from: state.as_str() });
        }

        let round = self.runner.next_round();
        let span = trace_round(round);
        let fetched = self.runner.fetch_round().instrument(span.clone()).await;
        self.runner.commit_round(fetched).instrument(span).await
    }
}

impl RoundRunner {
    fn next_round(&self) -> u64 {
        self.rounds.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let outcome = AssertUnwindSafe(self.poll_loop(&mut shutdown))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(SchedulerError::WorkerPanicked(panic_message(payload.as_ref()))));
        if let Err(err) = outcome {
            error!("Polling scheduler stopped on fatal error: {}", err);
            self.fatal.send_replace(Some(err));
        }
        self.state.send_replace(SchedulerState::Stopped);
    }

    async fn poll_loop(&self, shutdown: &mut watch::Receiver<bool>) -> Result<(), SchedulerError> {
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let guard = tokio::select! {
                biased;
                _ = shutdown.changed() => return Ok(()),
                guard = self.round_lock.lock() => guard,
            };

            let round = self.next_round();
            let span = trace_round(round);
            let started = Instant::now();

            // Nothing is written before the fetch phase completes, so
            // abandoning here leaves every cache untouched.
            let fetched = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    ROUNDS_ABANDONED.inc();
                    info!(round, "Round abandoned on shutdown");
                    return Ok(());
                }
                fetched = self.fetch_round().instrument(span.clone()) => fetched,
            };

            self.commit_round(fetched).instrument(span).await?;
            ROUND_LATENCY.observe(started.elapsed().as_secs_f64());
            drop(guard);

            tokio::select! {
                biased;
                _ = shutdown.changed() => return Ok(()),
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }
    }

    async fn fetch_round(&self) -> RoundFetch {
        let connectors: Vec<Arc<Connector>> = self.registry.snapshot().await.into_iter().collect();
        let timeout = self.config.fetch_timeout();

        let mut pending = Vec::with_capacity(connectors.len());
        for (index, connector) in connectors.iter().enumerate() {
            if !connector.is_connected().await {
                continue;
            }

            let connector = Arc::clone(connector);
            let span = trace_fetch(connector.name());
            pending.push(
                async move {
                    let result = match tokio::time::timeout(timeout, connector.fetch()).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Timeout(timeout)),
                    };
                    (index, result)
                }
                .instrument(span),
            );
        }

        let results = join_all(pending).await;
        RoundFetch { connectors, results }
    }

    async fn commit_round(&self, round: RoundFetch) -> Result<Arc<AggregatedSnapshot>, SchedulerError> {
        let fetched_at = Timestamp::now();
        let mut fresh: Vec<Option<AccountData>> = vec![None; round.connectors.len()];

        for (index, result) in round.results {
            let connector = &round.connectors[index];
            match result {
                Ok(data) => {
                    debug!(
                        source = connector.name(),
                        balance = data.balance.total,
                        positions = data.positions.len(),
                        "Fetched account data"
                    );
                    fresh[index] = Some(data);
                }
                Err(err) => {
                    FETCH_FAILURES.inc();
                    if matches!(err, FetchError::Timeout(_)) {
                        FETCH_TIMEOUTS.inc();
                    }
                    self.sink.report(&FailureReport::fetch(connector.name(), &err));
                }
            }
        }

        let mut statuses = Vec::with_capacity(round.connectors.len());
        for (connector, data) in round.connectors.iter().zip(&fresh) {
            let mut status = connector.status().await;
            if let Some(data) = data {
                status.balance = data.balance;
                status.positions = data.positions.clone();
                status.last_fetch_at = Some(fetched_at);
            }
            statuses.push(status);
        }

        let generated_at = Timestamp::now();
        let aggregator = &self.aggregator;
        let snapshot = std::panic::catch_unwind(AssertUnwindSafe(|| {
            aggregator.aggregate(&statuses, generated_at)
        }))
        .map_err(|payload| SchedulerError::AggregationPanicked(panic_message(payload.as_ref())))??;

        for (connector, data) in round.connectors.iter().zip(fresh) {
            if let Some(data) = data {
                connector.apply_fetch(data, fetched_at).await;
            }
        }

        CONNECTED_SOURCES.set(snapshot.connected_sources() as i64);
        let snapshot = Arc::new(snapshot);
        self.publisher.publish(Arc::clone(&snapshot));
        ROUNDS_COMPLETED.inc();

        debug!(
            total_balance = snapshot.total_balance,
            positions = snapshot.positions.len(),
            "Published snapshot"
        );
        Ok(snapshot)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
