#![allow(clippy::unwrap_used)]
// Behavioral tests for `Coordinator` against an in-memory schedule source.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use pretty_assertions::assert_eq;
use tokio::sync::watch;

use radiotabla_core::{
    Bucket, Channel, ChannelId, Coordinator, CoordinatorConfig, CoreError, DisplayState,
    FetchFailure, FetchState, Notice, ProgramEntry, ScheduleSource,
};

const P1: ChannelId = ChannelId::new(132);
const P3: ChannelId = ChannelId::new(164);
const FINSKA: ChannelId = ChannelId::new(2576);

// ── Fake source ─────────────────────────────────────────────────────

#[derive(Clone)]
struct FakeSource {
    state: Arc<FakeState>,
}

struct FakeState {
    channels: Mutex<Vec<Channel>>,
    catalog_failure: Mutex<Option<FetchFailure>>,
    failures: Mutex<HashMap<ChannelId, FetchFailure>>,
    empty: Mutex<HashSet<ChannelId>>,
    day_calls: Mutex<HashMap<ChannelId, usize>>,
    catalog_calls: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl FakeSource {
    fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Arc::new(FakeState {
                channels: Mutex::new(vec![
                    Channel::new(P1, "P1"),
                    Channel::new(P3, "P3 Din Kanal"),
                    Channel::new(FINSKA, "Sveriges Radio Finska"),
                ]),
                catalog_failure: Mutex::new(None),
                failures: Mutex::new(HashMap::new()),
                empty: Mutex::new(HashSet::new()),
                day_calls: Mutex::new(HashMap::new()),
                catalog_calls: AtomicUsize::new(0),
                gate,
            }),
        }
    }

    fn close_gate(&self) {
        self.state.gate.send_replace(false);
    }

    fn open_gate(&self) {
        self.state.gate.send_replace(true);
    }

    fn fail_channel(&self, id: ChannelId, failure: FetchFailure) {
        self.state.failures.lock().unwrap().insert(id, failure);
    }

    fn heal_channel(&self, id: ChannelId) {
        self.state.failures.lock().unwrap().remove(&id);
    }

    fn serve_empty(&self, id: ChannelId) {
        self.state.empty.lock().unwrap().insert(id);
    }

    fn fail_catalog(&self, failure: Option<FetchFailure>) {
        *self.state.catalog_failure.lock().unwrap() = failure;
    }

    fn set_channels(&self, channels: Vec<Channel>) {
        *self.state.channels.lock().unwrap() = channels;
    }

    fn day_calls(&self, id: ChannelId) -> usize {
        self.state
            .day_calls
            .lock()
            .unwrap()
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    fn catalog_calls(&self) -> usize {
        self.state.catalog_calls.load(Ordering::SeqCst)
    }

    fn entry_for(date: NaiveDate) -> ProgramEntry {
        let now = Utc::now();
        ProgramEntry {
            program_id: Some(4540),
            episode_id: Some(i64::from(date.num_days_from_ce())),
            title: format!("Ekot {date}"),
            description: "Nyheter".into(),
            start: now - chrono::Duration::minutes(30),
            end: now + chrono::Duration::minutes(30),
            image_url: String::new(),
        }
    }
}

fn failure(kind: FetchFailure) -> CoreError {
    CoreError::Fetch {
        kind,
        detail: format!("injected {kind}"),
    }
}

impl ScheduleSource for FakeSource {
    async fn fetch_catalog(&self) -> Result<Vec<Channel>, CoreError> {
        self.state.catalog_calls.fetch_add(1, Ordering::SeqCst);
        let injected = *self.state.catalog_failure.lock().unwrap();
        if let Some(kind) = injected {
            return Err(failure(kind));
        }
        Ok(self.state.channels.lock().unwrap().clone())
    }

    async fn fetch_day(
        &self,
        id: ChannelId,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, CoreError> {
        *self.state.day_calls.lock().unwrap().entry(id).or_insert(0) += 1;

        let mut gate = self.state.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        let injected = self.state.failures.lock().unwrap().get(&id).copied();
        if let Some(kind) = injected {
            return Err(failure(kind));
        }
        if self.state.empty.lock().unwrap().contains(&id) {
            return Ok(Vec::new());
        }
        Ok(vec![Self::entry_for(date)])
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn quiet_config() -> CoordinatorConfig {
    CoordinatorConfig {
        initial_refresh: false,
        fetch_timeout: Duration::from_secs(5),
        ..CoordinatorConfig::default()
    }
    .without_timer()
}

async fn started(source: &FakeSource, config: CoordinatorConfig) -> Coordinator<FakeSource> {
    let coordinator = Coordinator::new(source.clone(), config);
    coordinator.start().await.unwrap();
    coordinator
}

async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

async fn display_where(
    coordinator: &Coordinator<FakeSource>,
    pred: impl FnMut(&DisplayState) -> bool,
) -> DisplayState {
    let mut display = coordinator.display();
    tokio::time::timeout(Duration::from_secs(2), display.wait_for(pred))
        .await
        .expect("display condition not reached within 2s")
        .unwrap()
}

async fn populate(coordinator: &Coordinator<FakeSource>, id: ChannelId) {
    coordinator.select(id).await.unwrap();
    let cache = Arc::clone(coordinator.cache());
    eventually(|| cache.is_populated(id)).await;
}

// ── Selection path ──────────────────────────────────────────────────

#[tokio::test]
async fn test_single_flight_on_repeated_selection() {
    let source = FakeSource::new();
    source.close_gate();
    let coordinator = started(&source, quiet_config()).await;

    coordinator.select(P3).await.unwrap();
    coordinator.select(P3).await.unwrap();
    eventually(|| source.day_calls(P3) == 2).await;

    let loading = display_where(&coordinator, |d| d.selected == Some(P3)).await;
    assert!(loading.is_loading());
    assert_eq!(coordinator.cache().in_flight_ids(), vec![P3]);

    source.open_gate();
    let shown = display_where(&coordinator, |d| d.state == FetchState::Fetched).await;

    // One fetch spans two day pages; a second fetch would double this.
    assert_eq!(source.day_calls(P3), 2);
    assert_eq!(*shown.schedule, *coordinator.cache().get(P3));
    assert_eq!(shown.schedule.len(), 2);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_cached_selection_skips_network() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;

    populate(&coordinator, P1).await;
    populate(&coordinator, P3).await;
    let before = coordinator.display().latest().revision;

    coordinator.select(P1).await.unwrap();
    let shown = display_where(&coordinator, |d| d.revision > before).await;

    assert_eq!(shown.selected, Some(P1));
    assert_eq!(shown.state, FetchState::Fetched);
    assert_eq!(source.day_calls(P1), 2);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_failed_fetch_leaves_cache_empty_and_notifies() {
    let source = FakeSource::new();
    source.fail_channel(P1, FetchFailure::HostUnreachable);
    let coordinator = started(&source, quiet_config()).await;
    let mut notices = coordinator.notices();

    coordinator.select(P1).await.unwrap();
    let notice = tokio::time::timeout(Duration::from_secs(2), notices.recv())
        .await
        .unwrap()
        .unwrap();

    assert!(matches!(
        notice,
        Notice::FetchFailed { channel, failure: FetchFailure::HostUnreachable, .. } if channel == P1
    ));
    assert_ne!(
        notice.user_message(),
        FetchFailure::NetworkUnreachable.user_message()
    );
    let cache = Arc::clone(coordinator.cache());
    eventually(|| cache.state(P1) == FetchState::Unfetched).await;
    assert!(cache.get(P1).is_empty());

    // One failed day ends the fetch, so the other page may never be asked for.
    let calls = source.day_calls(P1);
    assert!(calls >= 1);

    // No automatic retry.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.day_calls(P1), calls);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_completion_for_deselected_channel_does_not_take_over_display() {
    let source = FakeSource::new();
    source.close_gate();
    let coordinator = started(&source, quiet_config()).await;

    coordinator.select(P1).await.unwrap();
    coordinator.select(P3).await.unwrap();
    eventually(|| source.day_calls(P1) == 2 && source.day_calls(P3) == 2).await;

    source.open_gate();
    let cache = Arc::clone(coordinator.cache());
    eventually(|| cache.is_populated(P1) && cache.is_populated(P3)).await;

    let shown = display_where(&coordinator, |d| d.state == FetchState::Fetched).await;
    assert_eq!(shown.selected, Some(P3));
    assert_eq!(*shown.schedule, *cache.get(P3));
    assert_eq!(*coordinator.tracked(), vec![P1, P3]);

    coordinator.shutdown().await;
}

// ── Bulk path ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_refresh_loads_catalog_and_revisits_tracked_channels() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;

    let first = coordinator.refresh().await.unwrap();
    assert_eq!(first.catalog_size, Some(3));
    assert!(first.refreshed.is_empty());

    let parts = coordinator.catalog().partition();
    assert_eq!(parts[0].0, Bucket::P1);
    assert_eq!(parts[2].1[0].id, P3);
    assert_eq!(parts[4].1[0].id, FINSKA);

    populate(&coordinator, P1).await;
    let second = coordinator.refresh().await.unwrap();

    assert!(second.is_success());
    assert_eq!(second.refreshed, vec![P1]);
    assert_eq!(second.tracked, vec![P1]);
    assert_eq!(source.day_calls(P1), 4);
    assert_eq!(source.day_calls(P3), 0);
    let p1 = coordinator.catalog().get(P1).unwrap();
    assert_eq!(*p1.schedule, *coordinator.cache().get(P1));

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_refresh_isolates_channel_failures() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;
    coordinator.refresh().await.unwrap();
    populate(&coordinator, P1).await;
    populate(&coordinator, P3).await;

    source.fail_channel(P3, FetchFailure::NetworkUnreachable);
    let mut notices = coordinator.notices();
    let report = coordinator.refresh().await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.refreshed, vec![P1]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].channel, P3);
    assert_eq!(report.failed[0].failure, FetchFailure::NetworkUnreachable);
    // The old schedule survives the failure.
    assert!(coordinator.cache().is_populated(P3));

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.failure(), FetchFailure::NetworkUnreachable);
    assert!(notices.try_recv().is_err(), "exactly one notice per failure");

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_catalog_failure_keeps_previous_catalog() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;
    coordinator.refresh().await.unwrap();

    source.fail_catalog(Some(FetchFailure::Other));
    let mut notices = coordinator.notices();
    let report = coordinator.refresh().await.unwrap();

    assert_eq!(report.catalog_size, None);
    assert_eq!(report.catalog_failure, Some(FetchFailure::Other));
    assert_eq!(coordinator.catalog().len(), 3);
    assert!(matches!(
        notices.try_recv().unwrap(),
        Notice::CatalogFailed { failure: FetchFailure::Other, .. }
    ));

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_channels_leaving_the_catalog_are_forgotten() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;
    coordinator.refresh().await.unwrap();
    populate(&coordinator, P3).await;

    source.set_channels(vec![Channel::new(P1, "P1")]);
    let report = coordinator.refresh().await.unwrap();

    assert!(!coordinator.cache().is_populated(P3));
    assert!(report.tracked.is_empty());
    assert!(coordinator.catalog().get(P3).is_none());

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_pending_fetch_for_withdrawn_channel_is_reported() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;
    coordinator.refresh().await.unwrap();

    source.close_gate();
    coordinator.select(P3).await.unwrap();
    eventually(|| source.day_calls(P3) >= 1).await;

    source.set_channels(vec![Channel::new(P1, "P1")]);
    let mut notices = coordinator.notices();
    coordinator.refresh().await.unwrap();

    let notice = tokio::time::timeout(Duration::from_secs(2), notices.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        notice,
        Notice::FetchFailed { channel, failure: FetchFailure::Other, .. } if channel == P3
    ));
    assert_eq!(coordinator.cache().state(P3), FetchState::Unfetched);

    // The late result is discarded.
    source.open_gate();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!coordinator.cache().is_populated(P3));

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_refreshes_collapse() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;
    coordinator.refresh().await.unwrap();
    populate(&coordinator, P1).await;
    let catalog_before = source.catalog_calls();
    let days_before = source.day_calls(P1);

    source.close_gate();
    let opener = {
        let source = source.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            source.open_gate();
        }
    };
    let (a, b, ()) = tokio::join!(coordinator.refresh(), coordinator.refresh(), opener);
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.started_at, b.started_at);
    assert_eq!(source.catalog_calls(), catalog_before + 1);
    assert_eq!(source.day_calls(P1), days_before + 2);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_refresh_skips_channels_already_in_flight() {
    let source = FakeSource::new();
    source.close_gate();
    let coordinator = started(&source, quiet_config()).await;

    coordinator.select(P3).await.unwrap();
    eventually(|| source.day_calls(P3) == 2).await;

    let (report, ()) = tokio::join!(coordinator.refresh(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        source.open_gate();
    });
    let report = report.unwrap();

    assert_eq!(report.skipped, vec![P3]);
    assert_eq!(source.day_calls(P3), 2);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_last_selection_wins_after_bulk_refresh() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;
    coordinator.refresh().await.unwrap();
    populate(&coordinator, P3).await;
    populate(&coordinator, P1).await;

    source.close_gate();
    let refresh = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.refresh().await })
    };
    eventually(|| source.day_calls(P1) == 4 && source.day_calls(P3) == 4).await;

    // Selection changes while the refresh is in flight.
    coordinator.select(P3).await.unwrap();
    source.open_gate();
    refresh.await.unwrap().unwrap();

    let shown = coordinator.display().latest();
    assert_eq!(shown.selected, Some(P3));
    assert_eq!(*shown.schedule, *coordinator.cache().get(P3));

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_empty_schedule_is_refetched_on_next_selection() {
    let source = FakeSource::new();
    source.serve_empty(P1);
    let coordinator = started(&source, quiet_config()).await;

    coordinator.select(P1).await.unwrap();
    display_where(&coordinator, |d| d.state == FetchState::Fetched).await;
    assert!(!coordinator.cache().is_populated(P1));

    let report = coordinator.refresh().await.unwrap();
    assert_eq!(report.unchanged, vec![P1]);
    assert!(report.tracked.is_empty());
    assert_eq!(coordinator.cache().state(P1), FetchState::Unfetched);

    let calls = source.day_calls(P1);
    coordinator.select(P1).await.unwrap();
    eventually(|| source.day_calls(P1) == calls + 2).await;

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_recovered_channel_fetches_again_after_failure() {
    let source = FakeSource::new();
    source.fail_channel(P1, FetchFailure::Other);
    let coordinator = started(&source, quiet_config()).await;

    coordinator.select(P1).await.unwrap();
    let cache = Arc::clone(coordinator.cache());
    eventually(|| source.day_calls(P1) >= 1 && cache.state(P1) == FetchState::Unfetched).await;
    let failed_calls = source.day_calls(P1);

    source.heal_channel(P1);
    coordinator.select(P1).await.unwrap();
    eventually(|| cache.is_populated(P1)).await;
    assert_eq!(source.day_calls(P1), failed_calls + 2);

    coordinator.shutdown().await;
}

// ── Timer, lifecycle, ad hoc ────────────────────────────────────────

#[tokio::test]
async fn test_timer_drives_periodic_refresh() {
    let source = FakeSource::new();
    let config = CoordinatorConfig {
        refresh_interval: Duration::from_millis(30),
        max_backoff: Duration::from_millis(120),
        fetch_timeout: Duration::from_secs(5),
        initial_refresh: true,
    };
    let coordinator = started(&source, config).await;

    eventually(|| source.catalog_calls() >= 3).await;
    assert_eq!(coordinator.catalog().len(), 3);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_commands_fail_after_shutdown() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;
    coordinator.shutdown().await;

    assert!(matches!(
        coordinator.select(P1).await,
        Err(CoreError::CoordinatorStopped)
    ));
    assert!(matches!(
        coordinator.refresh().await,
        Err(CoreError::CoordinatorStopped)
    ));
}

#[tokio::test]
async fn test_ad_hoc_fetch_bypasses_cache() {
    let source = FakeSource::new();
    let coordinator = started(&source, quiet_config()).await;

    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let entries = coordinator.fetch_schedule(P1, Some(date)).await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(source.day_calls(P1), 1);
    assert!(coordinator.cache().get(P1).is_empty());
    assert_eq!(coordinator.cache().state(P1), FetchState::Unfetched);

    coordinator.shutdown().await;
}
