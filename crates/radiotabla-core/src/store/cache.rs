// ── Schedule cache ──
//
// Per-channel schedule storage with an explicit fetch state machine.
// Writes lock a single `DashMap` shard, so completions landing from
// background tasks never contend with readers of other channels.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use tokio::sync::watch;

use crate::model::{ChannelId, ProgramEntry};

/// Where a channel's schedule is in its fetch lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum FetchState {
    /// Never fetched, or reset after a failure or an empty result.
    #[default]
    Unfetched,
    /// A fetch holding this generation's ticket is in flight.
    Fetching { generation: u64 },
    /// At least one fetch has completed; selections use the cached schedule.
    Fetched,
}

/// Permission to complete one in-flight fetch.
///
/// Not `Clone`: a ticket is consumed by exactly one of
/// [`ScheduleCache::complete_fetch`] or [`ScheduleCache::abandon_fetch`].
#[derive(Debug)]
#[must_use = "a fetch ticket must be completed or abandoned"]
pub struct FetchTicket {
    channel: ChannelId,
    generation: u64,
}

impl FetchTicket {
    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Outcome of [`ScheduleCache::complete_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The result was stored; this is the schedule now visible.
    Applied(Arc<Vec<ProgramEntry>>),
    /// A newer fetch or an invalidation superseded this ticket.
    Stale,
}

/// Point-in-time copy of every cached schedule, keyed by channel.
pub type CacheSnapshot = BTreeMap<ChannelId, Arc<Vec<ProgramEntry>>>;

#[derive(Debug, Clone, Default)]
struct CacheEntry {
    schedule: Arc<Vec<ProgramEntry>>,
    state: FetchState,
    ever_fetched: bool,
    last_updated: Option<DateTime<Utc>>,
}

/// Concurrency-safe map from channel id to its known schedule.
pub struct ScheduleCache {
    entries: DashMap<ChannelId, CacheEntry>,
    /// Generations are unique across all channels and never reused, so a
    /// ticket outliving an `invalidate` can never match a later fetch.
    next_generation: AtomicU64,
    /// Bumped whenever any stored schedule changes.
    version: watch::Sender<u64>,
}

impl ScheduleCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            entries: DashMap::new(),
            next_generation: AtomicU64::new(1),
            version,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current schedule for `id`, empty if none. Never blocks on a fetch.
    pub fn get(&self, id: ChannelId) -> Arc<Vec<ProgramEntry>> {
        self.entries
            .get(&id)
            .map(|e| Arc::clone(&e.schedule))
            .unwrap_or_default()
    }

    /// `true` iff the stored schedule is non-empty.
    pub fn is_populated(&self, id: ChannelId) -> bool {
        self.entries.get(&id).is_some_and(|e| !e.schedule.is_empty())
    }

    pub fn state(&self, id: ChannelId) -> FetchState {
        self.entries.get(&id).map(|e| e.state).unwrap_or_default()
    }

    pub fn last_updated(&self, id: ChannelId) -> Option<DateTime<Utc>> {
        self.entries.get(&id).and_then(|e| e.last_updated)
    }

    /// Channels with a non-empty schedule, ascending.
    pub fn populated_ids(&self) -> Vec<ChannelId> {
        self.collect_ids(|e| !e.schedule.is_empty())
    }

    /// Channels with a fetch in flight, ascending.
    pub fn in_flight_ids(&self) -> Vec<ChannelId> {
        self.collect_ids(|e| matches!(e.state, FetchState::Fetching { .. }))
    }

    /// Every channel the cache holds an entry for, ascending.
    pub fn known_ids(&self) -> Vec<ChannelId> {
        self.collect_ids(|_| true)
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.entries
            .iter()
            .map(|r| (*r.key(), Arc::clone(&r.value().schedule)))
            .collect()
    }

    /// Version counter that ticks on every schedule change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Swap in `schedule` wholesale, outside the ticket protocol.
    ///
    /// An in-flight fetch keeps its ticket and may still overwrite this.
    pub fn replace(&self, id: ChannelId, schedule: Vec<ProgramEntry>) -> Arc<Vec<ProgramEntry>> {
        let schedule = Arc::new(schedule);
        {
            let mut entry = self.entries.entry(id).or_default();
            entry.schedule = Arc::clone(&schedule);
            entry.ever_fetched = true;
            entry.last_updated = Some(Utc::now());
            if !matches!(entry.state, FetchState::Fetching { .. }) {
                entry.state = FetchState::Fetched;
            }
        }
        self.bump_version();
        schedule
    }

    /// Single-flight gate: claim the right to fetch `id`.
    ///
    /// Returns `None` while another fetch for `id` is in flight.
    pub fn try_begin_fetch(&self, id: ChannelId) -> Option<FetchTicket> {
        let mut entry = self.entries.entry(id).or_default();
        if matches!(entry.state, FetchState::Fetching { .. }) {
            return None;
        }
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        entry.state = FetchState::Fetching { generation };
        Some(FetchTicket {
            channel: id,
            generation,
        })
    }

    /// Store a fetch result if `ticket` is still the current generation.
    pub fn complete_fetch(&self, ticket: FetchTicket, entries: Vec<ProgramEntry>) -> Completion {
        let applied = {
            let Some(mut entry) = self.entries.get_mut(&ticket.channel) else {
                return Completion::Stale;
            };
            if entry.state != (FetchState::Fetching { generation: ticket.generation }) {
                return Completion::Stale;
            }
            let schedule = Arc::new(entries);
            entry.schedule = Arc::clone(&schedule);
            entry.state = FetchState::Fetched;
            entry.ever_fetched = true;
            entry.last_updated = Some(Utc::now());
            schedule
        };
        self.bump_version();
        Completion::Applied(applied)
    }

    /// Release a ticket without touching the stored schedule.
    ///
    /// Returns `true` if the ticket was current and the state was rolled back.
    pub fn abandon_fetch(&self, ticket: FetchTicket) -> bool {
        let Some(mut entry) = self.entries.get_mut(&ticket.channel) else {
            return false;
        };
        if entry.state != (FetchState::Fetching { generation: ticket.generation }) {
            return false;
        }
        entry.state = if entry.ever_fetched {
            FetchState::Fetched
        } else {
            FetchState::Unfetched
        };
        true
    }

    /// Forget `id` entirely; any in-flight result for it becomes stale.
    pub fn invalidate(&self, id: ChannelId) -> bool {
        let removed = self.entries.remove(&id).is_some();
        if removed {
            self.bump_version();
        }
        removed
    }

    /// Reset a fetched-but-empty channel so its next selection fetches again.
    pub fn mark_unfetched(&self, id: ChannelId) -> bool {
        match self.entries.entry(id) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                if entry.state == FetchState::Fetched && entry.schedule.is_empty() {
                    entry.state = FetchState::Unfetched;
                    entry.ever_fetched = false;
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn collect_ids(&self, pred: impl Fn(&CacheEntry) -> bool) -> Vec<ChannelId> {
        let mut ids: Vec<ChannelId> = self
            .entries
            .iter()
            .filter(|r| pred(r.value()))
            .map(|r| *r.key())
            .collect();
        ids.sort_unstable();
        ids
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for ScheduleCache {
    fn default() -> Self {
        Self::new()
    }
}
