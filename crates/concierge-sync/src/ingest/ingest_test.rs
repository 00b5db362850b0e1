use std::sync::Mutex;

use concierge_core::FixedClock;
use concierge_db::MemoryStore;

use super::*;
use crate::testing::{catalog_doc, record, t0, ScriptedVendor, StreamScript};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<IngestProgress>>,
}

#[async_trait]
impl IngestObserver for Recorder {
    async fn on_progress(&self, progress: &IngestProgress) {
        self.events.lock().unwrap().push(progress.clone());
    }
}

/// A sink whose commits never finish in time.
struct StuckSink;

#[async_trait]
impl CommitSink for StuckSink {
    async fn commit(&self, _batch: Vec<CatalogRecord>) -> Result<UpsertSummary, SyncError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(UpsertSummary::default())
    }
}

/// A store-backed sink that yields once before each commit.
struct YieldingSink(StoreSink);

#[async_trait]
impl CommitSink for YieldingSink {
    async fn commit(&self, batch: Vec<CatalogRecord>) -> Result<UpsertSummary, SyncError> {
        tokio::task::yield_now().await;
        self.0.commit(batch).await
    }
}

fn groups(codes: &[&str]) -> HashSet<String> {
    codes.iter().map(ToString::to_string).collect()
}

fn sink(store: &Arc<MemoryStore>) -> StoreSink {
    StoreSink::new(store.clone(), Arc::new(FixedClock::new(t0())), "stream")
}

fn ingestor(script: StreamScript) -> StreamIngestor {
    StreamIngestor::new(Arc::new(ScriptedVendor::with_stream(script)))
}

#[tokio::test]
async fn caps_limit_what_is_kept() {
    let records: Vec<_> = ["A", "A", "A", "B", "B"]
        .iter()
        .enumerate()
        .map(|(i, g)| record(&format!("H{i}"), g, "X"))
        .collect();
    let store = Arc::new(MemoryStore::new());
    let options = StreamOptions::new(groups(&["A", "B"]), 2, 3, Duration::from_secs(10));

    let report = ingestor(StreamScript::Fast(catalog_doc(&records)))
        .run(&options, &sink(&store), &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.seeded, 3);
    assert_eq!(report.per_group_counts.get("A"), Some(&2));
    assert_eq!(report.per_group_counts.get("B"), Some(&1));
    assert!(report.aborted_early);
    assert_eq!(report.abort_reason, Some(AbortReason::OverallCap));
    assert_eq!(store.count_hotels().await.unwrap(), 3);
    assert!(store.hotel("H2").is_none());
}

#[tokio::test]
async fn first_batch_is_committed_early() {
    let records: Vec<_> = (0..45).map(|i| record(&format!("H{i:02}"), "FR", "Paris")).collect();
    let store = Arc::new(MemoryStore::new());
    let recorder = Recorder::default();
    let options = StreamOptions::new(groups(&["FR"]), 100, 100, Duration::from_secs(10));

    let report = ingestor(StreamScript::Fast(catalog_doc(&records)))
        .run(&options, &sink(&store), &recorder)
        .await
        .unwrap();

    assert_eq!(report.seeded, 45);
    assert_eq!(report.processed, 45);
    assert!(!report.aborted_early);
    assert_eq!(report.upserts.inserted, 45);

    let events = recorder.events.lock().unwrap();
    let stages: Vec<_> = events.iter().map(|e| e.stage).collect();
    assert_eq!(stages.first(), Some(&SeedStage::Fetching));
    assert_eq!(stages.last(), Some(&SeedStage::Writing));
    let first_commit = events
        .iter()
        .find(|e| e.seeded > 0)
        .expect("a commit was reported");
    assert_eq!(first_commit.seeded, FIRST_BATCH_SIZE as u64);
    assert_eq!(first_commit.stage, SeedStage::Streaming);
}

#[tokio::test]
async fn hard_timeout_is_a_partial_success() {
    let records: Vec<_> = (0..200).map(|i| record(&format!("H{i:03}"), "FR", "Nice")).collect();
    let store = Arc::new(MemoryStore::new());
    let mut options = StreamOptions::new(groups(&["FR"]), 500, 500, Duration::from_millis(200));
    options.close_grace = Duration::from_millis(50);

    let started = std::time::Instant::now();
    let report = ingestor(StreamScript::Slow {
        doc: catalog_doc(&records),
        chunk: 16,
        delay: Duration::from_millis(5),
    })
    .run(&options, &sink(&store), &NoProgress)
    .await
    .expect("a timeout is not an error");

    assert!(report.aborted_early);
    assert_eq!(report.abort_reason, Some(AbortReason::HardTimeout));
    assert!(report.processed < 200);
    // Everything accepted before the cut-off was flushed.
    assert_eq!(store.count_hotels().await.unwrap(), report.seeded);
    assert_eq!(report.seeded, report.processed);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn slow_parser_shutdown_leaves_time_for_final_flush() {
    let records: Vec<_> = (0..50).map(|i| record(&format!("H{i:02}"), "FR", "Nice")).collect();
    let store = Arc::new(MemoryStore::new());
    let mut options = StreamOptions::new(groups(&["FR"]), 500, 500, Duration::from_millis(1000));
    options.close_grace = Duration::from_secs(5);

    // The parser thread sits in a 600ms read when the read deadline hits.
    let started = std::time::Instant::now();
    let report = ingestor(StreamScript::Slow {
        doc: catalog_doc(&records),
        chunk: 1024,
        delay: Duration::from_millis(600),
    })
    .run(&options, &YieldingSink(sink(&store)), &NoProgress)
    .await
    .unwrap();

    assert!(report.aborted_early);
    assert_eq!(report.abort_reason, Some(AbortReason::HardTimeout));
    assert!(report.processed > 0);
    assert_eq!(report.seeded, report.processed);
    assert_eq!(store.count_hotels().await.unwrap(), report.seeded);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn duplicate_ids_are_kept_once() {
    let records = vec![
        record("H1", "FR", "Paris"),
        record("H1", "FR", "Paris"),
        record("H2", "FR", "Lyon"),
        record("H1", "FR", "Paris"),
    ];
    let store = Arc::new(MemoryStore::new());
    let options = StreamOptions::new(groups(&["FR"]), 2, 10, Duration::from_secs(10));

    let report = ingestor(StreamScript::Fast(catalog_doc(&records)))
        .run(&options, &sink(&store), &NoProgress)
        .await
        .unwrap();

    assert_eq!(report.processed, 4);
    assert_eq!(report.seeded, 2);
    assert_eq!(report.upserts.inserted, 2);
    assert_eq!(report.per_group_counts.get("FR"), Some(&2));
    assert_eq!(store.count_hotels().await.unwrap(), 2);
}

#[tokio::test]
async fn stuck_commit_still_resolves_at_hard_limit() {
    let records: Vec<_> = (0..3).map(|i| record(&format!("H{i}"), "FR", "Lyon")).collect();
    let options = StreamOptions::new(groups(&["FR"]), 10, 10, Duration::from_millis(150));

    let started = std::time::Instant::now();
    let report = ingestor(StreamScript::Fast(catalog_doc(&records)))
        .run(&options, &StuckSink, &NoProgress)
        .await
        .unwrap();
    assert!(report.aborted_early);
    assert_eq!(report.seeded, 0);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn malformed_body_flushes_then_fails() {
    let doc = br#"{"hotels":[{"id":"H1","country":"FR"},{"id":"H2","country":"FR"},{"id":]}"#;
    let store = Arc::new(MemoryStore::new());
    let options = StreamOptions::new(groups(&["FR"]), 10, 10, Duration::from_secs(10));

    let err = ingestor(StreamScript::Fast(doc.to_vec()))
        .run(&options, &sink(&store), &NoProgress)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "decode_error");
    assert_eq!(store.count_hotels().await.unwrap(), 2);
}

#[tokio::test]
async fn open_failure_is_surfaced() {
    let options = StreamOptions::new(groups(&["FR"]), 10, 10, Duration::from_secs(10));
    let err = ingestor(StreamScript::OpenFails(502))
        .run(&options, &StuckSink, &NoProgress)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "server_error");
    assert_eq!(err.upstream_status(), Some(502));
}

#[tokio::test]
async fn reingesting_counts_updates() {
    let records = vec![record("H1", "FR", "Paris")];
    let store = Arc::new(MemoryStore::new());
    let options = StreamOptions::new(groups(&["FR"]), 10, 10, Duration::from_secs(10));

    for _ in 0..2 {
        ingestor(StreamScript::Fast(catalog_doc(&records)))
            .run(&options, &sink(&store), &NoProgress)
            .await
            .unwrap();
    }
    let report = ingestor(StreamScript::Fast(catalog_doc(&records)))
        .run(&options, &sink(&store), &NoProgress)
        .await
        .unwrap();
    assert_eq!(report.upserts.inserted, 0);
    assert_eq!(report.upserts.updated, 1);
    assert_eq!(store.count_hotels().await.unwrap(), 1);
}
