use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, HistogramOpts, IntGauge, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Round metrics
    pub static ref ROUNDS_COMPLETED: Counter = Counter::new(
        "feed_rounds_completed_total",
        "Total number of polling rounds published"
    ).expect("valid metric definition");

    pub static ref ROUNDS_ABANDONED: Counter = Counter::new(
        "feed_rounds_abandoned_total",
        "Total number of polling rounds abandoned on shutdown"
    ).expect("valid metric definition");

    pub static ref SNAPSHOTS_PUBLISHED: Counter = Counter::new(
        "feed_snapshots_published_total",
        "Total number of snapshots handed to consumers"
    ).expect("valid metric definition");

    // Source metrics
    pub static ref FETCH_FAILURES: Counter = Counter::new(
        "feed_fetch_failures_total",
        "Total number of failed connector fetches"
    ).expect("valid metric definition");

    pub static ref FETCH_TIMEOUTS: Counter = Counter::new(
        "feed_fetch_timeouts_total",
        "Total number of connector fetches that hit the timeout"
    ).expect("valid metric definition");

    pub static ref CONNECT_FAILURES: Counter = Counter::new(
        "feed_connect_failures_total",
        "Total number of failed connector handshakes"
    ).expect("valid metric definition");

    pub static ref CONNECTED_SOURCES: IntGauge = IntGauge::new(
        "feed_connected_sources",
        "Connected sources in the latest round"
    ).expect("valid metric definition");

    // Latency metrics
    pub static ref ROUND_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "feed_round_latency_seconds",
            "Wall time of one polling round"
        ).buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    ).expect("valid metric definition");
}

pub fn register_metrics() -> Result<(), prometheus::Error> {
    REGISTRY.register(Box::new(ROUNDS_COMPLETED.clone()))?;
    REGISTRY.register(Box::new(ROUNDS_ABANDONED.clone()))?;
    REGISTRY.register(Box::new(SNAPSHOTS_PUBLISHED.clone()))?;
    REGISTRY.register(Box::new(FETCH_FAILURES.clone()))?;
    REGISTRY.register(Box::new(FETCH_TIMEOUTS.clone()))?;
    REGISTRY.register(Box::new(CONNECT_FAILURES.clone()))?;
    REGISTRY.register(Box::new(CONNECTED_SOURCES.clone()))?;
    REGISTRY.register(Box::new(ROUND_LATENCY.clone()))?;
    Ok(())
}
