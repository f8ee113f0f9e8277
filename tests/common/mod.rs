#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use account_feed::account_infra::connectors::AccountSource;
use account_feed::account_infra::{ConnectorKind, RawAccountData, RawPosition};
use account_feed::config::{AppConfig, SchedulerConfig};
use account_feed::error::{ConnectionError, FetchError};
use account_feed::interfaces::{FailureReport, FailureSink};
use account_feed::types::AccountBalance;

/// One scripted fetch outcome.
#[derive(Clone, Debug)]
pub enum Step {
    Data(RawAccountData),
    Fail(FetchError),
    Hang,
}

/// In-process account source that replays a script of fetch outcomes. The
/// last step repeats once the script runs out.
pub struct ScriptedSource {
    kind: ConnectorKind,
    accept: bool,
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    fetches: Mutex<usize>,
}

impl ScriptedSource {
    pub fn new(kind: ConnectorKind, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(ScriptedSource {
            kind,
            accept: true,
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            fetches: Mutex::new(0),
        })
    }

    pub fn rejecting(kind: ConnectorKind) -> Arc<Self> {
        Arc::new(ScriptedSource {
            kind,
            accept: false,
            steps: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            fetches: Mutex::new(0),
        })
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }

    fn next_step(&self) -> Step {
        *self.fetches.lock().unwrap() += 1;
        let mut last = self.last.lock().unwrap();
        match self.steps.lock().unwrap().pop_front() {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last
                .clone()
                .unwrap_or_else(|| Step::Fail(FetchError::Transport("empty script".into()))),
        }
    }
}

#[async_trait]
impl AccountSource for ScriptedSource {
    fn kind(&self) -> ConnectorKind {
        self.kind
    }

    async fn probe(&self, source_name: &str) -> Result<(), ConnectionError> {
        if self.accept {
            Ok(())
        } else {
            Err(ConnectionError::AuthRejected {
                source_name: source_name.to_string(),
                message: "invalid api key".into(),
            })
        }
    }

    async fn fetch(&self) -> Result<RawAccountData, FetchError> {
        match self.next_step() {
            Step::Data(data) => Ok(data),
            Step::Fail(err) => Err(err),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Transport("woke from hang".into()))
            }
        }
    }
}

#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<FailureReport>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl FailureSink for RecordingSink {
    fn report(&self, failure: &FailureReport) {
        self.reports.lock().unwrap().push(failure.clone());
    }
}

pub fn data(total: f64, positions: Vec<RawPosition>) -> Step {
    Step::Data(RawAccountData {
        balance: AccountBalance::new(total, total, 0.0),
        positions,
    })
}

pub fn long(symbol: &str, quantity: f64, entry: f64, mark: f64, pnl: f64) -> RawPosition {
    RawPosition {
        symbol: symbol.to_string(),
        side_token: Some("LONG".into()),
        quantity,
        entry_price: entry,
        mark_price: mark,
        unrealized_pnl: pnl,
    }
}

pub fn fast_config() -> AppConfig {
    AppConfig {
        scheduler: SchedulerConfig {
            poll_interval_ms: 20,
            fetch_timeout_ms: 100,
            connect_timeout_ms: 500,
            stale_after_ms: 10_000,
        },
        ..AppConfig::default()
    }
}
