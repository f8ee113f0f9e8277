pub mod failure_sink;

pub use failure_sink::{FailureReport, FailureSink, FailureStage, TracingFailureSink};
