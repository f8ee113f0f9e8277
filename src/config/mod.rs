use serde::{Deserialize, Serialize};

pub mod accounts;
pub mod endpoints;
pub mod loader;
pub mod scheduler;

pub use accounts::{AccountConfig, AccountSettings};
pub use endpoints::EndpointConfig;
pub use loader::AppConfig;
pub use scheduler::SchedulerConfig;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}
