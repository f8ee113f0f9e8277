pub mod publisher;
pub mod registry;
pub mod scheduler;
pub mod service;

pub use publisher::{SnapshotPublisher, SnapshotSlot};
pub use registry::ConnectorRegistry;
pub use scheduler::{PollingScheduler, SchedulerState};
pub use service::{AccountFeed, BootstrapOutcome, ConnectorEntry};
