//! End-to-end cycles over real cursor stores.
//!
//! These tests drive [`Pipeline`] with scripted batches against the SQLite
//! and file backends, restarting the engine from disk where durability is
//! the point.

use std::sync::Arc;
use std::time::Duration;

use perpwatch::adapter::outbound::store::{FileCursorStore, SqliteCursorStore};
use perpwatch::adapter::outbound::subgraph::source::{merge_pages, parse_response};
use perpwatch::application::{Enricher, Pipeline, WatermarkEngine};
use perpwatch::domain::{Cursor, StoreCapability, StreamName, TokenRegistry};
use perpwatch::infrastructure::orchestration::poll::{catch_up, PollSettings};
use perpwatch::port::outbound::cursor::CursorStore;
use perpwatch::port::outbound::lookup::PositionSnapshot;
use perpwatch::port::outbound::source::SourceBatch;
use perpwatch::testkit::domain::{decrease, increase, usd, BTC, TRADER, USDC};
use perpwatch::testkit::lookup::{FailingPrices, StaticPositions, StaticPrices};
use perpwatch::testkit::notifier::RecordingNotifier;
use perpwatch::testkit::source::ScriptedSource;
use rust_decimal_macros::dec;
use serde_json::json;
use tempfile::TempDir;

fn enricher() -> Enricher {
    Enricher::new(TokenRegistry::bnb_defaults(), Duration::from_secs(60))
}

fn sqlite(dir: &TempDir) -> Arc<SqliteCursorStore> {
    let path = dir.path().join("perpwatch.db");
    Arc::new(SqliteCursorStore::open(&path.display().to_string(), StreamName::new("subgraph")).unwrap())
}

fn pipeline_at(
    store: Arc<dyn CursorStore>,
    last_ts: u64,
    notifier: &Arc<RecordingNotifier>,
) -> Pipeline {
    let engine = WatermarkEngine::with_cursor(store, Cursor::new(last_ts));
    Pipeline::new(engine, enricher(), notifier.clone())
}

async fn reopened(store: Arc<dyn CursorStore>, notifier: &Arc<RecordingNotifier>) -> Pipeline {
    let engine = WatermarkEngine::open(store).await;
    Pipeline::new(engine, enricher(), notifier.clone())
}

#[tokio::test]
async fn fresh_batch_is_delivered_and_watermark_passes_it() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite(&dir);
    let notifier = Arc::new(RecordingNotifier::new());
    let mut pipeline = pipeline_at(store.clone(), 1000, &notifier);

    let report = pipeline
        .run_cycle(SourceBatch::complete(vec![
            increase("a", 1000),
            increase("b", 1000),
            increase("c", 1005),
        ]))
        .await;

    assert_eq!(report.delivered, 3);
    assert_eq!(report.advanced_to, Some(Cursor::new(1006)));
    assert_eq!(notifier.delivered_ids(), vec!["a", "b", "c"]);
    assert!(store.seen_buckets().await.unwrap().is_empty());
    assert_eq!(store.load().await, Cursor::new(1006));
}

#[tokio::test]
async fn replayed_batch_never_reaches_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite(&dir);
    let notifier = Arc::new(RecordingNotifier::new());
    let mut pipeline = pipeline_at(store.clone(), 1000, &notifier);
    let batch = || SourceBatch::complete(vec![increase("a", 1000), increase("c", 1005)]);

    pipeline.run_cycle(batch()).await;
    let attempts = notifier.attempts();
    let replay = pipeline.run_cycle(batch()).await;

    assert_eq!(replay.stale, 2);
    assert_eq!(replay.delivered, 0);
    assert_eq!(notifier.attempts(), attempts);
    assert_eq!(pipeline.cursor(), Cursor::new(1006));
}

#[tokio::test]
async fn failed_delivery_is_retried_after_restart_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    notifier.fail_once("x");

    {
        let store = sqlite(&dir);
        let mut pipeline = pipeline_at(store.clone(), 1006, &notifier);
        let report = pipeline
            .run_cycle(SourceBatch::complete(vec![increase("x", 1010), increase("y", 1012)]))
            .await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(pipeline.cursor(), Cursor::new(1010));
        assert_eq!(store.seen_buckets().await.unwrap(), vec![1012]);
    }

    // A new process over the same database.
    let store = sqlite(&dir);
    let mut pipeline = reopened(store.clone(), &notifier).await;
    assert_eq!(pipeline.cursor(), Cursor::new(1010));

    let report = pipeline
        .run_cycle(SourceBatch::complete(vec![increase("x", 1010), increase("y", 1012)]))
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(report.duplicates, 1);
    assert_eq!(notifier.delivered_ids(), vec!["y", "x"]);
    assert_eq!(pipeline.cursor(), Cursor::new(1013));
    assert!(store.seen_buckets().await.unwrap().is_empty());
}

#[tokio::test]
async fn best_effort_store_redelivers_after_a_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cursor.json");
    let notifier = Arc::new(RecordingNotifier::new());
    notifier.fail_once("x");

    let store: Arc<dyn CursorStore> =
        Arc::new(FileCursorStore::new(&path, StreamName::new("subgraph")));
    assert_eq!(store.capability(), StoreCapability::BestEffort);

    let mut pipeline = pipeline_at(store, 1006, &notifier);
    pipeline
        .run_cycle(SourceBatch::complete(vec![increase("x", 1010), increase("y", 1012)]))
        .await;
    assert_eq!(pipeline.cursor(), Cursor::new(1010));

    let store: Arc<dyn CursorStore> =
        Arc::new(FileCursorStore::new(&path, StreamName::new("subgraph")));
    let mut pipeline = reopened(store, &notifier).await;
    assert_eq!(pipeline.cursor(), Cursor::new(1010));

    pipeline
        .run_cycle(SourceBatch::complete(vec![increase("x", 1010), increase("y", 1012)]))
        .await;

    // Without a seen-set, `y` goes out twice; nothing is lost.
    assert_eq!(notifier.delivered_ids(), vec!["y", "x", "y"]);
    assert_eq!(pipeline.cursor(), Cursor::new(1013));
}

#[tokio::test]
async fn price_outage_renders_placeholder_and_still_advances() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite(&dir);
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = WatermarkEngine::with_cursor(store, Cursor::new(1000));
    let enricher = enricher().with_prices(Arc::new(FailingPrices));
    let mut pipeline = Pipeline::new(engine, enricher, notifier.clone());

    let report = pipeline
        .run_cycle(SourceBatch::complete(vec![decrease("d", 1020)]))
        .await;

    assert_eq!(report.delivered, 1);
    assert_eq!(pipeline.cursor(), Cursor::new(1021));
    let text = &notifier.delivered_messages()[0].text;
    assert!(text.starts_with("📉 <b>Decrease LONG</b>"));
    assert!(text.contains("• Mark Price: —"));
}

#[tokio::test]
async fn price_lookup_fills_missing_mark_price() {
    let notifier = Arc::new(RecordingNotifier::new());
    let dir = tempfile::tempdir().unwrap();
    let engine = WatermarkEngine::with_cursor(sqlite(&dir), Cursor::new(1000));
    let enricher = enricher().with_prices(Arc::new(StaticPrices::new(dec!(61000))));
    let mut pipeline = Pipeline::new(engine, enricher, notifier.clone());

    pipeline
        .run_cycle(SourceBatch::complete(vec![decrease("d", 1020)]))
        .await;

    let text = &notifier.delivered_messages()[0].text;
    assert!(text.contains("• Mark Price: $61000"));
}

fn subgraph_change(id: &str, ts: u64) -> serde_json::Value {
    json!({
        "id": id,
        "account": TRADER.to_string(),
        "collateralToken": USDC.to_string(),
        "indexToken": BTC.to_string(),
        "collateralDelta": usd(1_000).to_string(),
        "sizeDelta": usd(5_000).to_string(),
        "isLong": true,
        "price": usd(60_000).to_string(),
        "timestamp": ts,
    })
}

#[tokio::test]
async fn subgraph_page_flows_through_enrichment_to_the_sink() {
    let tx = format!("0x{}", "ab".repeat(32));
    let body = json!({ "data": {
        "increases": [subgraph_change(&format!("{tx}:3"), 1_700_000_100)],
        "decreases": [],
        "liquidations": [],
    }})
    .to_string();
    let batch = merge_pages(parse_response(&body).unwrap(), 100);
    assert!(!batch.truncated);

    let dir = tempfile::tempdir().unwrap();
    let notifier = Arc::new(RecordingNotifier::new());
    let engine = WatermarkEngine::with_cursor(sqlite(&dir), Cursor::new(1_700_000_000));
    let positions = StaticPositions::new(Some(PositionSnapshot {
        size: usd(20_000),
        collateral: usd(2_000),
        average_price: usd(58_000),
        has_profit: true,
        delta: usd(250),
    }));
    let enricher = enricher().with_positions(Arc::new(positions));
    let mut pipeline = Pipeline::new(engine, enricher, notifier.clone());

    let report = pipeline.run_cycle(batch).await;

    assert_eq!(report.delivered, 1);
    assert_eq!(pipeline.cursor(), Cursor::new(1_700_000_101));
    let text = &notifier.delivered_messages()[0].text;
    assert!(text.starts_with("📈 <b>Increase LONG</b>"));
    assert!(text.contains("• Pair: BTC"));
    assert!(text.contains("• Size: $20000.00"));
    assert!(text.contains("• Leverage: 10.0x"));
    assert!(text.contains("• Entry Price: $58000"));
    assert!(text.contains("• Mark Price: $60000"));
    assert!(text.contains("• PnL: 🟢 +$250.00"));
    assert!(text.contains(&format!("/tx/{tx}")));
}

#[tokio::test]
async fn catch_up_drains_a_backlog_into_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite(&dir);
    let notifier = Arc::new(RecordingNotifier::new());
    let mut pipeline = pipeline_at(store.clone(), 100, &notifier);
    let source = ScriptedSource::new().with_batches(vec![
        SourceBatch {
            events: vec![increase("a", 100), increase("b", 104)],
            truncated: true,
        },
        SourceBatch::complete(vec![increase("b", 104), increase("c", 104), increase("d", 110)]),
    ]);
    let settings = PollSettings {
        interval: Duration::from_secs(1),
        page_size: 2,
        max_page_size: 8,
        max_pages_per_cycle: 5,
    };

    let report = catch_up(&mut pipeline, &source, &settings).await.unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.delivered, 4);
    assert!(!report.stuck);
    assert_eq!(notifier.delivered_ids(), vec!["a", "b", "c", "d"]);
    assert_eq!(store.load().await, Cursor::new(111));
    assert!(store.seen_buckets().await.unwrap().is_empty());
}
