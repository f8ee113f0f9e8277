pub mod account_infra;
pub mod config;
pub mod display;
pub mod error;
pub mod feed;
pub mod interfaces;
pub mod observability;
pub mod types;
pub mod utils;

pub use account_infra::aggregator::{AccountAggregator, AggregatedSnapshot, SourceSummary};
pub use account_infra::connector::{Connector, ConnectorStatus};
pub use account_infra::{ConnectionState, ConnectorKind, Credentials};
pub use error::{Error, Result};
pub use feed::{AccountFeed, PollingScheduler, SchedulerState, SnapshotPublisher};

// Every supported source reports balances in this asset
pub const QUOTE_ASSET: &str = "USDT";
