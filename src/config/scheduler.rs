use std::time::Duration;
use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub poll_interval_ms: u64,
    pub fetch_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub stale_after_ms: u64,
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("fetch_timeout_ms", self.fetch_timeout_ms),
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("stale_after_ms", self.stale_after_ms),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(Error::ConfigError(format!("scheduler.{} must be positive", name)));
            }
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            poll_interval_ms: 2_000,     // 2 seconds between rounds
            fetch_timeout_ms: 5_000,
            connect_timeout_ms: 10_000,
            stale_after_ms: 10_000,
        }
    }
}
