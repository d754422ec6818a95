// ── Refresh coordinator ──
//
// Decides when schedules are fetched and funnels every result back into
// the cache, the catalog and the display feed. One actor task owns the
// selection, the tracked set and all fetch tickets; background fetches
// report to it over a channel and never mutate shared state themselves.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::config::CoordinatorConfig;
use crate::error::{CoreError, FetchFailure};
use crate::fetch::{self, ScheduleSource, with_timeout};
use crate::model::{Channel, ChannelId, ProgramEntry};
use crate::store::{Catalog, Completion, FetchState, FetchTicket, ScheduleCache};
use crate::stream::{DisplayState, DisplayStream};

const COMMAND_CHANNEL_SIZE: usize = 64;
const NOTICE_CHANNEL_SIZE: usize = 64;

// ── Notice ───────────────────────────────────────────────────────

/// One user-visible report per failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A schedule fetch for one channel failed; its cache entry is unchanged.
    FetchFailed {
        channel: ChannelId,
        failure: FetchFailure,
        detail: String,
    },
    /// The catalog fetch of a bulk refresh failed; the old catalog stays.
    CatalogFailed { failure: FetchFailure, detail: String },
    /// A bulk refresh could not run to completion at all.
    RefreshFailed { failure: FetchFailure, detail: String },
}

impl Notice {
    pub fn failure(&self) -> FetchFailure {
        match self {
            Self::FetchFailed { failure, .. }
            | Self::CatalogFailed { failure, .. }
            | Self::RefreshFailed { failure, .. } => *failure,
        }
    }

    pub fn user_message(&self) -> &'static str {
        self.failure().user_message()
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchFailed { channel, .. } => {
                write!(f, "channel {channel}: {}", self.user_message())
            }
            Self::CatalogFailed { .. } => write!(f, "channel list: {}", self.user_message()),
            Self::RefreshFailed { .. } => write!(f, "refresh: {}", self.user_message()),
        }
    }
}

// ── RefreshReport ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelFailure {
    pub channel: ChannelId,
    pub failure: FetchFailure,
}

/// Summary of one bulk refresh, handed to every caller that waited on it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Channel count of the new catalog, `None` if the catalog fetch failed.
    pub catalog_size: Option<usize>,
    pub catalog_failure: Option<FetchFailure>,
    /// Channels whose schedule was replaced.
    pub refreshed: Vec<ChannelId>,
    /// Channels whose fetch came back empty; their old schedule was kept.
    pub unchanged: Vec<ChannelId>,
    /// Channels skipped because a fetch for them was already in flight.
    pub skipped: Vec<ChannelId>,
    pub failed: Vec<ChannelFailure>,
    /// The tracked set after the refresh.
    pub tracked: Vec<ChannelId>,
}

impl RefreshReport {
    pub fn is_success(&self) -> bool {
        self.catalog_failure.is_none() && self.failed.is_empty()
    }
}

// ── Coordinator ──────────────────────────────────────────────────

/// The entry point for consumers.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Commands sent before
/// [`start()`](Self::start) are queued and handled once the actor runs.
pub struct Coordinator<S: ScheduleSource> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S: ScheduleSource> Clone for Coordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<S> {
    source: Arc<S>,
    config: CoordinatorConfig,
    cache: Arc<ScheduleCache>,
    catalog: Arc<Catalog>,
    display: watch::Sender<DisplayState>,
    tracked: watch::Sender<Arc<Vec<ChannelId>>>,
    notices: broadcast::Sender<Notice>,
    command_tx: mpsc::Sender<Command>,
    command_rx: Mutex<Option<mpsc::Receiver<Command>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: ScheduleSource> Coordinator<S> {
    /// Create a coordinator. Does NOT start it -- call [`start()`](Self::start).
    pub fn new(source: S, config: CoordinatorConfig) -> Self {
        let (display, _) = watch::channel(DisplayState::default());
        let (tracked, _) = watch::channel(Arc::new(Vec::new()));
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_SIZE);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(CoordinatorInner {
                source: Arc::new(source),
                config,
                cache: Arc::new(ScheduleCache::new()),
                catalog: Arc::new(Catalog::new()),
                display,
                tracked,
                notices,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn cache(&self) -> &Arc<ScheduleCache> {
        &self.inner.cache
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.inner.catalog
    }

    pub fn source(&self) -> &Arc<S> {
        &self.inner.source
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the actor and, when configured, the refresh timer.
    ///
    /// Issues an immediate bulk refresh if `initial_refresh` is set.
    /// Calling `start()` twice is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::CoordinatorStopped);
        }
        let Some(rx) = self.inner.command_rx.lock().await.take() else {
            debug!("coordinator already started");
            return Ok(());
        };

        let mut handles = self.inner.task_handles.lock().await;

        let actor = Actor::new(Arc::clone(&self.inner));
        handles.push(tokio::spawn(actor.run(rx)));

        if self.inner.config.initial_refresh {
            self.send(Command::Refresh(None)).await?;
        }

        if !self.inner.config.refresh_interval.is_zero() {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(refresh_task(coordinator, cancel)));
        }

        info!(
            interval_secs = self.inner.config.refresh_interval.as_secs(),
            "coordinator started"
        );
        Ok(())
    }

    /// Cancel background tasks and wait for them to finish.
    ///
    /// In-flight fetches are dropped; their results are never applied.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("coordinator stopped");
    }

    // ── Commands ─────────────────────────────────────────────────

    /// The user selected `id`.
    ///
    /// Cached channels are shown at once. An unfetched channel gets one
    /// fetch; selecting it again while that fetch runs starts nothing new.
    pub async fn select(&self, id: ChannelId) -> Result<(), CoreError> {
        self.send(Command::Select(id)).await
    }

    /// Run a bulk refresh now and wait for its report.
    ///
    /// If one is already running, this waits for that one instead.
    pub async fn refresh(&self) -> Result<RefreshReport, CoreError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Refresh(Some(tx))).await?;
        rx.await.map_err(|_| CoreError::CoordinatorStopped)
    }

    /// Fetch a schedule without touching the cache.
    ///
    /// With `date`, only that day's page is requested. The result is always
    /// cut to the relevance window around now.
    pub async fn fetch_schedule(
        &self,
        id: ChannelId,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ProgramEntry>, CoreError> {
        let now = Local::now().fixed_offset();
        with_timeout(
            self.inner.config.fetch_timeout,
            fetch::fetch_schedule(self.inner.source.as_ref(), id, date, now),
        )
        .await
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to display updates.
    pub fn display(&self) -> DisplayStream {
        DisplayStream::new(self.inner.display.subscribe())
    }

    /// Subscribe to failure notices.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    pub fn selected(&self) -> Option<ChannelId> {
        self.inner.display.borrow().selected
    }

    /// Channels the bulk refresher currently revisits, ascending.
    pub fn tracked(&self) -> Arc<Vec<ChannelId>> {
        Arc::clone(&self.inner.tracked.borrow())
    }

    async fn send(&self, command: Command) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::CoordinatorStopped);
        }
        self.inner
            .command_tx
            .send(command)
            .await
            .map_err(|_| CoreError::CoordinatorStopped)
    }
}

// ── Actor ────────────────────────────────────────────────────────

type FetchResult = Result<Vec<ProgramEntry>, CoreError>;

enum Command {
    Select(ChannelId),
    Refresh(Option<oneshot::Sender<RefreshReport>>),
    FetchDone {
        id: ChannelId,
        generation: u64,
        result: FetchResult,
    },
    RefreshDone(Box<RefreshOutcome>),
    RefreshAborted(String),
}

struct RefreshOutcome {
    catalog: Result<Vec<Channel>, CoreError>,
    schedules: Vec<(ChannelId, u64, FetchResult)>,
}

struct RunningRefresh {
    started_at: DateTime<Utc>,
    jobs: Vec<(ChannelId, u64)>,
    skipped: Vec<ChannelId>,
    waiters: Vec<oneshot::Sender<RefreshReport>>,
}

/// The single-threaded owner of selection, tracking and merge logic.
///
/// Every handler is synchronous: network work is spawned, and its result
/// comes back as another command.
struct Actor<S: ScheduleSource> {
    inner: Arc<CoordinatorInner<S>>,
    selected: Option<ChannelId>,
    tracked: BTreeSet<ChannelId>,
    /// Tickets for every fetch in flight, keyed by channel.
    pending: HashMap<ChannelId, FetchTicket>,
    refresh: Option<RunningRefresh>,
}

impl<S: ScheduleSource> Actor<S> {
    fn new(inner: Arc<CoordinatorInner<S>>) -> Self {
        Self {
            inner,
            selected: None,
            tracked: BTreeSet::new(),
            pending: HashMap::new(),
            refresh: None,
        }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let cancel = self.inner.cancel.clone();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                command = rx.recv() => {
                    let Some(command) = command else { break };
                    self.handle(command);
                }
            }
        }
        debug!("coordinator actor exited");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Select(id) => self.on_select(id),
            Command::Refresh(reply) => self.on_refresh(reply),
            Command::FetchDone {
                id,
                generation,
                result,
            } => self.on_fetch_done(id, generation, result),
            Command::RefreshDone(outcome) => self.on_refresh_done(*outcome),
            Command::RefreshAborted(detail) => self.on_refresh_aborted(&detail),
        }
    }

    // ── Selection path ───────────────────────────────────────────

    fn on_select(&mut self, id: ChannelId) {
        self.selected = Some(id);
        let cache = &self.inner.cache;

        match cache.state(id) {
            FetchState::Fetched => debug!(channel = %id, "selection served from cache"),
            FetchState::Fetching { .. } => {
                debug!(channel = %id, "selection joins in-flight fetch");
                self.tracked.insert(id);
            }
            FetchState::Unfetched => {
                if let Some(ticket) = cache.try_begin_fetch(id) {
                    let generation = ticket.generation();
                    self.pending.insert(id, ticket);
                    self.tracked.insert(id);
                    self.spawn_fetch(id, generation);
                }
            }
        }

        self.publish_tracked();
        self.publish_display();
    }

    fn spawn_fetch(&self, id: ChannelId, generation: u64) {
        debug!(channel = %id, generation, "fetching schedule");
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            let now = Local::now().fixed_offset();
            let fetch = with_timeout(
                inner.config.fetch_timeout,
                fetch::fetch_schedule(inner.source.as_ref(), id, None, now),
            );
            let result = tokio::select! {
                biased;
                () = inner.cancel.cancelled() => return,
                result = fetch => result,
            };
            let _ = inner
                .command_tx
                .send(Command::FetchDone {
                    id,
                    generation,
                    result,
                })
                .await;
        });
    }

    fn on_fetch_done(&mut self, id: ChannelId, generation: u64, result: FetchResult) {
        let Some(ticket) = self.take_ticket(id, generation) else {
            debug!(channel = %id, generation, "discarding superseded fetch result");
            return;
        };

        match result {
            Ok(entries) => {
                let count = entries.len();
                match self.inner.cache.complete_fetch(ticket, entries) {
                    Completion::Applied(schedule) => {
                        self.inner.catalog.attach_schedule(id, &schedule);
                        debug!(channel = %id, count, "schedule stored");
                    }
                    Completion::Stale => {
                        debug!(channel = %id, generation, "schedule result was stale");
                    }
                }
            }
            Err(err) => {
                self.inner.cache.abandon_fetch(ticket);
                self.report_fetch_failure(id, &err);
            }
        }

        if self.selected == Some(id) {
            self.publish_display();
        }
    }

    // ── Bulk path ────────────────────────────────────────────────

    fn on_refresh(&mut self, reply: Option<oneshot::Sender<RefreshReport>>) {
        if let Some(running) = &mut self.refresh {
            debug!("joining in-flight bulk refresh");
            running.waiters.extend(reply);
            return;
        }

        let mut jobs = Vec::new();
        let mut skipped = Vec::new();
        for &id in &self.tracked {
            match self.inner.cache.try_begin_fetch(id) {
                Some(ticket) => {
                    jobs.push((id, ticket.generation()));
                    self.pending.insert(id, ticket);
                }
                None => skipped.push(id),
            }
        }

        info!(
            channels = jobs.len(),
            skipped = skipped.len(),
            "bulk refresh started"
        );

        self.refresh = Some(RunningRefresh {
            started_at: Utc::now(),
            jobs: jobs.clone(),
            skipped,
            waiters: reply.into_iter().collect(),
        });

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let mut gather = tokio::spawn(gather_refresh(
                Arc::clone(&inner.source),
                jobs,
                inner.config.fetch_timeout,
            ));
            let joined = tokio::select! {
                biased;
                () = inner.cancel.cancelled() => None,
                joined = &mut gather => Some(joined),
            };
            let Some(joined) = joined else {
                gather.abort();
                return;
            };
            let command = match joined {
                Ok(outcome) => Command::RefreshDone(Box::new(outcome)),
                Err(err) => Command::RefreshAborted(err.to_string()),
            };
            let _ = inner.command_tx.send(command).await;
        });
    }

    fn on_refresh_done(&mut self, outcome: RefreshOutcome) {
        let Some(running) = self.refresh.take() else {
            warn!("bulk refresh result arrived with no refresh running");
            return;
        };

        let mut report = RefreshReport {
            started_at: running.started_at,
            skipped: running.skipped,
            ..RefreshReport::default()
        };

        // Catalog first, so schedules below attach to the fresh channel objects.
        match outcome.catalog {
            Ok(channels) => {
                report.catalog_size = Some(channels.len());
                self.apply_catalog(channels);
            }
            Err(err) => {
                warn!(failure = %err.failure(), error = %err.detail(), "catalog refresh failed");
                report.catalog_failure = Some(err.failure());
                self.notify(Notice::CatalogFailed {
                    failure: err.failure(),
                    detail: err.detail(),
                });
            }
        }

        for (id, generation, result) in outcome.schedules {
            let Some(ticket) = self.take_ticket(id, generation) else {
                debug!(channel = %id, "bulk result superseded");
                continue;
            };
            match result {
                Ok(entries) if !entries.is_empty() => {
                    if let Completion::Applied(schedule) =
                        self.inner.cache.complete_fetch(ticket, entries)
                    {
                        self.inner.catalog.attach_schedule(id, &schedule);
                        report.refreshed.push(id);
                    }
                }
                Ok(_) => {
                    self.inner.cache.abandon_fetch(ticket);
                    report.unchanged.push(id);
                }
                Err(err) => {
                    self.inner.cache.abandon_fetch(ticket);
                    self.report_fetch_failure(id, &err);
                    report.failed.push(ChannelFailure {
                        channel: id,
                        failure: err.failure(),
                    });
                }
            }
        }

        self.rederive_tracked();
        // Last write wins: whatever is selected *now* gets the update.
        self.publish_display();

        report.tracked = self.tracked.iter().copied().collect();
        report.finished_at = Utc::now();
        info!(
            refreshed = report.refreshed.len(),
            failed = report.failed.len(),
            tracked = report.tracked.len(),
            catalog = ?report.catalog_size,
            "bulk refresh complete"
        );

        for waiter in running.waiters {
            let _ = waiter.send(report.clone());
        }
    }

    fn on_refresh_aborted(&mut self, detail: &str) {
        let Some(running) = self.refresh.take() else {
            return;
        };
        warn!(error = detail, "bulk refresh aborted");

        let mut report = RefreshReport {
            started_at: running.started_at,
            skipped: running.skipped,
            catalog_failure: Some(FetchFailure::Other),
            ..RefreshReport::default()
        };
        for (id, generation) in running.jobs {
            if let Some(ticket) = self.take_ticket(id, generation) {
                self.inner.cache.abandon_fetch(ticket);
                report.failed.push(ChannelFailure {
                    channel: id,
                    failure: FetchFailure::Other,
                });
            }
        }
        self.notify(Notice::RefreshFailed {
            failure: FetchFailure::Other,
            detail: detail.to_owned(),
        });

        self.rederive_tracked();
        self.publish_display();
        report.tracked = self.tracked.iter().copied().collect();
        report.finished_at = Utc::now();
        for waiter in running.waiters {
            let _ = waiter.send(report.clone());
        }
    }

    /// Swap in the new catalog and forget channels that left it.
    fn apply_catalog(&mut self, channels: Vec<Channel>) {
        let cache = &self.inner.cache;
        let catalog = &self.inner.catalog;
        catalog.replace(channels, cache);

        // An empty listing is treated as a service hiccup, not as every
        // channel having been withdrawn.
        if catalog.is_empty() {
            return;
        }
        for id in cache.known_ids() {
            if !catalog.contains(id) {
                debug!(channel = %id, "channel left the catalog");
                cache.invalidate(id);
                self.tracked.remove(&id);
                // A fetch still running for it will never land; whoever is
                // waiting on it hears about it here.
                if self.pending.remove(&id).is_some() {
                    self.report_fetch_failure(id, &CoreError::ChannelNotFound { id: id.get() });
                }
            }
        }
    }

    /// Tracked = populated ∪ in flight; channels that drop out and hold an
    /// empty fetched schedule go back to unfetched.
    fn rederive_tracked(&mut self) {
        let cache = &self.inner.cache;
        let mut next: BTreeSet<ChannelId> = cache.populated_ids().into_iter().collect();
        next.extend(cache.in_flight_ids());

        for id in self.tracked.difference(&next) {
            cache.mark_unfetched(*id);
        }
        self.tracked = next;
        self.publish_tracked();
    }

    // ── Helpers ──────────────────────────────────────────────────

    /// Remove and return the ticket for `id` if it is still `generation`.
    fn take_ticket(&mut self, id: ChannelId, generation: u64) -> Option<FetchTicket> {
        if self
            .pending
            .get(&id)
            .is_some_and(|t| t.generation() == generation)
        {
            self.pending.remove(&id)
        } else {
            None
        }
    }

    fn report_fetch_failure(&self, id: ChannelId, err: &CoreError) {
        warn!(
            channel = %id,
            failure = %err.failure(),
            error = %err.detail(),
            "schedule fetch failed"
        );
        self.notify(Notice::FetchFailed {
            channel: id,
            failure: err.failure(),
            detail: err.detail(),
        });
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine: nobody is listening for failures.
        let _ = self.inner.notices.send(notice);
    }

    fn publish_tracked(&self) {
        let ids: Vec<ChannelId> = self.tracked.iter().copied().collect();
        self.inner.tracked.send_replace(Arc::new(ids));
    }

    fn publish_display(&self) {
        let selected = self.selected;
        let (channel, schedule, state) = match selected {
            Some(id) => (
                self.inner.catalog.get(id),
                self.inner.cache.get(id),
                self.inner.cache.state(id),
            ),
            None => (None, Arc::default(), FetchState::Unfetched),
        };
        self.inner.display.send_modify(|display| {
            display.selected = selected;
            display.channel = channel;
            display.schedule = schedule;
            display.state = state;
            display.revision += 1;
        });
    }
}

/// Catalog and tracked-channel fetches for one bulk refresh, concurrently.
///
/// Failures are isolated per key: one channel's error never aborts another.
async fn gather_refresh<S: ScheduleSource>(
    source: Arc<S>,
    jobs: Vec<(ChannelId, u64)>,
    timeout: std::time::Duration,
) -> RefreshOutcome {
    let now = Local::now().fixed_offset();
    let source = source.as_ref();

    let catalog = with_timeout(timeout, source.fetch_catalog());
    let requests: Vec<_> = jobs
        .into_iter()
        .map(|(id, generation)| async move {
            let result = with_timeout(timeout, fetch::fetch_schedule(source, id, None, now)).await;
            (id, generation, result)
        })
        .collect();
    let schedules = join_all(requests);

    let (catalog, schedules) = tokio::join!(catalog, schedules);
    RefreshOutcome { catalog, schedules }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically trigger a bulk refresh, backing off after failures.
async fn refresh_task<S: ScheduleSource>(coordinator: Coordinator<S>, cancel: CancellationToken) {
    let config = coordinator.config();
    let mut backoff = Backoff::new(config.refresh_interval, config.max_backoff);

    loop {
        let delay = backoff.next_delay(&mut rand::thread_rng());
        debug!(delay_secs = delay.as_secs(), "next bulk refresh scheduled");

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = coordinator.refresh() => result,
        };

        match result {
            Ok(report) if report.is_success() => backoff.record_success(),
            Ok(_) => {
                backoff.record_failure();
                warn!(failures = backoff.failures(), "periodic refresh failed, backing off");
            }
            Err(_) => break,
        }
    }
}
