use crate::config::*;
use crate::error::{Error, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub endpoints: EndpointConfig,
    pub logging: LoggingConfig,
    pub accounts: Vec<AccountConfig>,
}

impl AppConfig {
    /// Layer `config/default`, optional `config/{env}` and `ACCOUNT_FEED__*`
    /// environment variables.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("ACCOUNT_FEED")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Self::finish(config)
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(input, FileFormat::Toml))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        Self::finish(config)
    }

    fn finish(config: Config) -> Result<Self> {
        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        app.scheduler.validate()?;
        Ok(app)
    }
}
