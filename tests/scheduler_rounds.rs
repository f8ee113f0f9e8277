mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};
use futures::StreamExt;
use account_feed::account_infra::{ConnectionState, ConnectorKind};
use account_feed::error::FetchError;
use account_feed::feed::{AccountFeed, SchedulerState};
use account_feed::interfaces::FailureStage;
use account_feed::types::Side;
use account_feed::Connector;
use common::{data, fast_config, long, RecordingSink, ScriptedSource, Step};

async fn feed_with(sources: Vec<(&str, Arc<ScriptedSource>)>) -> (AccountFeed, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let feed = AccountFeed::with_sink(&fast_config(), sink.clone());
    for (name, source) in sources {
        feed.register(Connector::new(name, source)).await.unwrap();
    }
    (feed, sink)
}

#[tokio::test]
async fn two_connected_sources_are_summed() {
    let a = ScriptedSource::new(ConnectorKind::Binance, vec![data(100.0, vec![])]);
    let b = ScriptedSource::new(
        ConnectorKind::Bybit,
        vec![data(200.0, vec![long("SYM", 1.0, 10.0, 12.0, 2.0)])],
    );
    let (feed, _) = feed_with(vec![("A", a), ("B", b)]).await;

    let snapshot = feed.poll_once().await.unwrap();

    assert_eq!(snapshot.total_balance, 300.0);
    assert_eq!(snapshot.positions.len(), 1);
    let position = &snapshot.positions[0];
    assert_eq!(position.source, "B");
    assert_eq!(position.symbol, "SYM");
    assert_eq!(position.side, Side::Long);
    assert_eq!(position.quantity, 1.0);
    assert_eq!(position.entry_price, 10.0);
    assert_eq!(position.mark_price, 12.0);
    assert_eq!(position.unrealized_pnl, 2.0);
}

#[tokio::test]
async fn timed_out_source_keeps_its_last_good_values() {
    let a = ScriptedSource::new(ConnectorKind::Binance, vec![data(100.0, vec![])]);
    let b = ScriptedSource::new(
        ConnectorKind::Bybit,
        vec![data(200.0, vec![long("SYM", 1.0, 10.0, 12.0, 2.0)]), Step::Hang],
    );
    let (feed, sink) = feed_with(vec![("A", a), ("B", b)]).await;

    let first = feed.poll_once().await.unwrap();
    let started = Instant::now();
    let second = feed.poll_once().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(second.total_balance, 300.0);
    assert_eq!(second.positions, first.positions);
    assert!(second.generated_at > first.generated_at);

    let reports = sink.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].source, "B");
    assert_eq!(reports[0].stage, FailureStage::Fetch);
    assert_eq!(reports[0].kind, "timeout");

    let b_state = feed.registry().get("B").await.unwrap().state().await;
    assert_eq!(b_state, ConnectionState::Connected);
}

#[tokio::test]
async fn zero_quantity_positions_never_reach_the_snapshot() {
    let c = ScriptedSource::new(
        ConnectorKind::Binance,
        vec![data(50.0, vec![long("FLAT", 0.0, 10.0, 10.0, 0.0)])],
    );
    let (feed, _) = feed_with(vec![("C", c)]).await;

    let snapshot = feed.poll_once().await.unwrap();
    assert_eq!(snapshot.total_balance, 50.0);
    assert!(snapshot.positions.is_empty());
}

#[tokio::test]
async fn source_that_never_fetched_is_stale_and_contributes_zero() {
    let a = ScriptedSource::new(ConnectorKind::Binance, vec![data(100.0, vec![])]);
    let b = ScriptedSource::new(
        ConnectorKind::Bybit,
        vec![Step::Fail(FetchError::Api { code: 10016, message: "server error".into() })],
    );
    let (feed, sink) = feed_with(vec![("A", a), ("B", b)]).await;

    let snapshot = feed.poll_once().await.unwrap();

    assert_eq!(snapshot.total_balance, 100.0);
    let b_summary = snapshot.sources.iter().find(|s| s.name == "B").unwrap();
    assert!(b_summary.is_stale);
    assert!(b_summary.last_fetch_at.is_none());
    assert_eq!(sink.reports()[0].kind, "api");
}

#[tokio::test]
async fn background_rounds_publish_monotonic_snapshots() {
    let a = ScriptedSource::new(ConnectorKind::Binance, vec![data(10.0, vec![])]);
    let (feed, _) = feed_with(vec![("A", a.clone())]).await;
    let mut updates = Box::pin(feed.updates());

    feed.start().await.unwrap();

    let mut previous = None;
    for _ in 0..3 {
        let snapshot = tokio::time::timeout(Duration::from_secs(2), updates.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.total_balance, 10.0);
        if let Some(prev) = previous {
            assert!(snapshot.generated_at >= prev);
        }
        previous = Some(snapshot.generated_at);
    }

    feed.shutdown().await.unwrap();
    assert_eq!(feed.scheduler_state(), SchedulerState::Stopped);
    assert!(a.fetches() >= 3);
}

#[tokio::test]
async fn stop_joins_the_worker_and_halts_fetching() {
    let a = ScriptedSource::new(ConnectorKind::Binance, vec![data(10.0, vec![])]);
    let (feed, _) = feed_with(vec![("A", a.clone())]).await;
    let mut receiver = feed.subscribe();

    feed.start().await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), receiver.changed())
        .await
        .unwrap()
        .unwrap();
    feed.shutdown().await.unwrap();

    let after_stop = a.fetches();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(a.fetches(), after_stop);

    // Second stop is a no-op
    feed.shutdown().await.unwrap();
}

#[tokio::test]
async fn stop_abandons_a_round_stuck_in_fetch() {
    let a = ScriptedSource::new(ConnectorKind::Binance, vec![Step::Hang]);
    let mut config = fast_config();
    config.scheduler.fetch_timeout_ms = 60_000;
    let feed = AccountFeed::with_sink(&config, Arc::new(RecordingSink::default()));
    feed.register(Connector::new("A", a.clone())).await.unwrap();

    feed.start().await.unwrap();
    while a.fetches() == 0 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let started = Instant::now();
    feed.shutdown().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(feed.latest().is_none());
}

#[tokio::test]
async fn latest_is_stable_between_publishes() {
    let a = ScriptedSource::new(ConnectorKind::Binance, vec![data(1.0, vec![])]);
    let (feed, _) = feed_with(vec![("A", a)]).await;
    feed.poll_once().await.unwrap();

    let first = feed.latest().unwrap();
    let second = feed.latest().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
}
