//! End-to-end tests for the search orchestrator
//!
//! These run complete searches against in-process providers:
//! resolve → fetch → history → reading
mod common;

use std::sync::Arc;

use tokio::sync::Notify;

use cosmic_birthday::error::AppError;
use cosmic_birthday::models::Reading;
use cosmic_birthday::pipeline::{ReadingSlot, SearchOrchestrator, SearchPhase};
use cosmic_birthday::services::{DateResolver, HISTORY_LIMIT, HistoryCache, ReadingProvider};
use cosmic_birthday::storage::MemoryStorage;
use common::{FakeArchive, FakeReadings, SLOT, history_entry};

async fn orchestrator(
    archive: Arc<FakeArchive>,
    readings: Option<Arc<FakeReadings>>,
    store: Arc<MemoryStorage>,
) -> SearchOrchestrator {
    let history = HistoryCache::load(store, SLOT).await;
    let readings = readings.map(|r| r as Arc<dyn ReadingProvider>);
    SearchOrchestrator::new(DateResolver::default(), archive, readings, history)
}

#[tokio::test]
async fn test_pre_archive_birthday_uses_fallback_year() {
    let archive = Arc::new(FakeArchive::new());
    let readings = Arc::new(FakeReadings::immediate());
    let store = Arc::new(MemoryStorage::new());
    let orch = orchestrator(archive.clone(), Some(readings.clone()), store.clone()).await;

    let ticket = orch.search("1970-01-01").await.expect("search should run");
    assert_eq!(ticket.phase, SearchPhase::Result);
    assert!(!ticket.superseded);
    ticket.reading_settled().await;

    assert_eq!(archive.requested(), vec!["2023-01-01"]);

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Result);
    assert_eq!(snapshot.birth_date.as_deref(), Some("1970-01-01"));
    assert_eq!(snapshot.resolved_date.as_deref(), Some("2023-01-01"));
    assert_eq!(snapshot.record.as_ref().unwrap().date, "2023-01-01");
    assert_eq!(snapshot.error, None);

    // History is keyed by the birth date, not the resolved one.
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].date, "1970-01-01");
    assert_eq!(snapshot.history[0].title, "Sky of 2023-01-01");
    assert_eq!(snapshot.history[0].thumbnail, "https://apod.example/2023-01-01.jpg");

    // The reading was asked for with the original birth date.
    assert_eq!(
        readings.calls(),
        vec![("2023-01-01".to_string(), "1970-01-01".to_string())]
    );
    assert_eq!(
        snapshot.reading,
        ReadingSlot::Ready(FakeReadings::reading_for("1970-01-01"))
    );

    // And it was persisted.
    let reloaded = HistoryCache::load(store, SLOT).await;
    assert_eq!(reloaded.entries(), snapshot.history.as_slice());
}

#[tokio::test]
async fn test_provider_error_is_surfaced_and_history_untouched() {
    let message = "Date must be between Jun 16, 1995 and Oct 19, 2026.";
    let archive = Arc::new(FakeArchive::new().failing("2001-09-11", message));
    let seeded = serde_json::to_vec(&vec![history_entry("1", "1999-12-31")]).unwrap();
    let store = Arc::new(MemoryStorage::with_slot(SLOT, seeded.clone()));
    let orch = orchestrator(archive, None, store.clone()).await;

    let ticket = orch.search("2001-09-11").await.unwrap();
    assert_eq!(ticket.phase, SearchPhase::Failed);
    assert!(matches!(ticket.error(), Some(AppError::Provider(m)) if m == message));

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Failed);
    assert_eq!(snapshot.error.as_deref(), Some(message));
    assert!(snapshot.record.is_none());
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].date, "1999-12-31");
    assert_eq!(store.get(SLOT), Some(seeded));
}

#[tokio::test]
async fn test_empty_input_is_a_no_op() {
    let archive = Arc::new(FakeArchive::new());
    let orch = orchestrator(archive.clone(), None, Arc::new(MemoryStorage::new())).await;

    assert!(orch.search("").await.is_none());
    assert!(orch.search("   ").await.is_none());

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Idle);
    assert_eq!(snapshot.request_id, 0);
    assert!(archive.requested().is_empty());
}

#[tokio::test]
async fn test_malformed_date_fails_without_fetching() {
    let archive = Arc::new(FakeArchive::new());
    let orch = orchestrator(archive.clone(), None, Arc::new(MemoryStorage::new())).await;

    let ticket = orch.search("31/12/1999").await.unwrap();
    assert_eq!(ticket.phase, SearchPhase::Failed);
    assert!(matches!(ticket.into_error(), Some(AppError::InvalidDate { .. })));

    let snapshot = orch.snapshot();
    assert!(snapshot.error.unwrap().starts_with("Invalid date '31/12/1999'"));
    assert!(archive.requested().is_empty());
    assert!(snapshot.history.is_empty());
}

#[tokio::test]
async fn test_reading_does_not_block_result() {
    let gate = Arc::new(Notify::new());
    let readings = Arc::new(FakeReadings::gated(gate.clone()));
    let orch = orchestrator(
        Arc::new(FakeArchive::new()),
        Some(readings),
        Arc::new(MemoryStorage::new()),
    )
    .await;

    let ticket = orch.search("2010-06-01").await.unwrap();

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Result);
    assert_eq!(snapshot.reading, ReadingSlot::Generating);
    assert_eq!(snapshot.history.len(), 1);

    gate.notify_one();
    ticket.reading_settled().await;

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Result);
    assert_eq!(
        snapshot.reading.reading(),
        Some(&FakeReadings::reading_for("2010-06-01"))
    );
}

#[tokio::test]
async fn test_without_reading_provider_slot_stays_absent() {
    let orch = orchestrator(
        Arc::new(FakeArchive::new()),
        None,
        Arc::new(MemoryStorage::new()),
    )
    .await;

    let ticket = orch.search("2010-06-01").await.unwrap();
    ticket.reading_settled().await;

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Result);
    assert_eq!(snapshot.reading, ReadingSlot::Absent);
}

#[tokio::test]
async fn test_superseded_result_is_dropped() {
    let archive = Arc::new(
        FakeArchive::new()
            .delayed("2000-01-01", 150)
            .delayed("2010-01-01", 10),
    );
    let readings = Arc::new(FakeReadings::immediate());
    let orch = orchestrator(archive, Some(readings.clone()), Arc::new(MemoryStorage::new())).await;

    let (slow, fast) = tokio::join!(orch.search("2000-01-01"), orch.search("2010-01-01"));
    let (slow, fast) = (slow.unwrap(), fast.unwrap());

    assert!(slow.superseded);
    assert!(!fast.superseded);
    let fast_request_id = fast.request_id;
    fast.reading_settled().await;
    slow.reading_settled().await;

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.request_id, fast_request_id);
    assert_eq!(snapshot.phase, SearchPhase::Result);
    assert_eq!(snapshot.birth_date.as_deref(), Some("2010-01-01"));
    assert_eq!(snapshot.record.unwrap().date, "2010-01-01");
    assert_eq!(
        snapshot.reading,
        ReadingSlot::Ready(FakeReadings::reading_for("2010-01-01"))
    );

    // Only the surviving search is remembered and only it asked for a reading.
    assert_eq!(snapshot.history.len(), 1);
    assert_eq!(snapshot.history[0].date, "2010-01-01");
    assert_eq!(readings.calls().len(), 1);
}

#[tokio::test]
async fn test_stale_reading_is_dropped() {
    let gate = Arc::new(Notify::new());
    let orch = orchestrator(
        Arc::new(FakeArchive::new().failing("2015-03-03", "No data available for date: 2015-03-03")),
        Some(Arc::new(FakeReadings::gated(gate.clone()))),
        Arc::new(MemoryStorage::new()),
    )
    .await;

    let first = orch.search("2015-03-02").await.unwrap();
    let second = orch.search("2015-03-03").await.unwrap();
    assert_eq!(second.phase, SearchPhase::Failed);

    gate.notify_one();
    first.reading_settled().await;

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Failed);
    assert_eq!(snapshot.reading, ReadingSlot::Absent);
    assert!(snapshot.record.is_none());
}

#[tokio::test]
async fn test_history_reselection_refetches_and_moves_to_front() {
    let archive = Arc::new(FakeArchive::new());
    let orch = orchestrator(archive.clone(), None, Arc::new(MemoryStorage::new())).await;

    orch.search("1985-07-13").await.unwrap();
    orch.search("2004-08-27").await.unwrap();

    let history = orch.history();
    assert_eq!(history[0].date, "2004-08-27");
    let older = history[1].clone();

    let ticket = orch.search_history_entry(&older.id).await.unwrap();
    assert_eq!(ticket.phase, SearchPhase::Result);

    assert_eq!(
        archive.requested(),
        vec!["2023-07-13", "2004-08-27", "2023-07-13"]
    );

    let history = orch.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, "1985-07-13");
    assert_ne!(history[0].id, older.id);
    assert_eq!(history[1].date, "2004-08-27");

    assert!(orch.search_history_entry("no-such-id").await.is_none());
}

#[tokio::test]
async fn test_history_is_capped_and_deduplicated() {
    let orch = orchestrator(
        Arc::new(FakeArchive::new()),
        None,
        Arc::new(MemoryStorage::new()),
    )
    .await;

    for day in 1..=7 {
        orch.search(&format!("2020-05-0{day}")).await.unwrap();
    }
    orch.search("2020-05-03").await.unwrap();

    let dates: Vec<_> = orch.history().into_iter().map(|e| e.date).collect();
    assert_eq!(dates.len(), HISTORY_LIMIT);
    assert_eq!(
        dates,
        vec![
            "2020-05-03",
            "2020-05-07",
            "2020-05-06",
            "2020-05-05",
            "2020-05-04",
            "2020-05-02",
        ]
    );
}

#[tokio::test]
async fn test_corrupt_history_starts_empty() {
    let store = Arc::new(MemoryStorage::with_slot(SLOT, "{\"oops\":"));
    let orch = orchestrator(Arc::new(FakeArchive::new()), None, store.clone()).await;

    assert!(orch.history().is_empty());

    orch.search("2020-05-01").await.unwrap();
    let reloaded = HistoryCache::load(store, SLOT).await;
    assert_eq!(reloaded.entries().len(), 1);
}

#[tokio::test]
async fn test_history_with_maximal_id_still_records() {
    let seeded =
        serde_json::to_vec(&vec![history_entry(&i64::MAX.to_string(), "1999-12-31")]).unwrap();
    let store = Arc::new(MemoryStorage::with_slot(SLOT, seeded));
    let orch = orchestrator(Arc::new(FakeArchive::new()), None, store).await;

    let ticket = orch.search("2020-05-01").await.unwrap();
    assert_eq!(ticket.phase, SearchPhase::Result);

    let history = orch.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].date, "2020-05-01");
    assert_ne!(history[0].id, history[1].id);
}

#[tokio::test]
async fn test_reset_returns_to_idle_and_keeps_history() {
    let orch = orchestrator(
        Arc::new(FakeArchive::new()),
        None,
        Arc::new(MemoryStorage::new()),
    )
    .await;

    orch.search("2020-05-01").await.unwrap();
    orch.reset();

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Idle);
    assert!(snapshot.record.is_none());
    assert_eq!(snapshot.history.len(), 1);
}

#[tokio::test]
async fn test_subscribers_see_state_changes() {
    let orch = orchestrator(
        Arc::new(FakeArchive::new()),
        None,
        Arc::new(MemoryStorage::new()),
    )
    .await;
    let mut rx = orch.subscribe();
    assert_eq!(rx.borrow_and_update().phase, SearchPhase::Idle);

    orch.search("2020-05-01").await.unwrap();

    assert!(rx.has_changed().unwrap());
    let snapshot = rx.borrow_and_update().clone();
    assert_eq!(snapshot.phase, SearchPhase::Result);
    assert_eq!(snapshot.history.len(), 1);
}

#[tokio::test]
async fn test_fallback_reading_keeps_result_phase() {
    struct AlwaysFallback;

    #[async_trait::async_trait]
    impl ReadingProvider for AlwaysFallback {
        async fn generate(
            &self,
            _record: &cosmic_birthday::models::ArchiveRecord,
            _birth_date: &str,
        ) -> Reading {
            Reading::fallback()
        }
    }

    let history = HistoryCache::load(Arc::new(MemoryStorage::new()), SLOT).await;
    let orch = SearchOrchestrator::new(
        DateResolver::default(),
        Arc::new(FakeArchive::new()),
        Some(Arc::new(AlwaysFallback)),
        history,
    );

    orch.search("2020-05-01").await.unwrap().reading_settled().await;

    let snapshot = orch.snapshot();
    assert_eq!(snapshot.phase, SearchPhase::Result);
    assert_eq!(snapshot.reading, ReadingSlot::Ready(Reading::fallback()));
}
