// ── Channel catalog ──
//
// The authoritative channel list. Readers get a cheap `Arc` snapshot;
// writers swap a whole new list in, so a reader never observes a
// half-merged catalog.

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::cache::ScheduleCache;
use crate::model::{Bucket, Channel, ChannelId, ProgramEntry};

/// Shared list of every known channel.
pub type CatalogSnapshot = Arc<Vec<Arc<Channel>>>;

pub struct Catalog {
    channels: ArcSwap<Vec<Arc<Channel>>>,
    last_refreshed: watch::Sender<Option<DateTime<Utc>>>,
}

impl Catalog {
    pub fn new() -> Self {
        let (last_refreshed, _) = watch::channel(None);
        Self {
            channels: ArcSwap::from_pointee(Vec::new()),
            last_refreshed,
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Replace the catalog wholesale with a freshly fetched list.
    ///
    /// Cached schedules are carried over by channel id; the previous
    /// channel objects are not consulted.
    pub fn replace(&self, channels: Vec<Channel>, cache: &ScheduleCache) {
        let merged = merge_schedules(channels, cache);
        self.channels.store(Arc::new(merged));
        self.last_refreshed.send_replace(Some(Utc::now()));
    }

    /// Swap in a copy of the catalog with one channel's schedule replaced.
    ///
    /// Returns `false` if `id` is not in the current catalog.
    pub fn attach_schedule(&self, id: ChannelId, schedule: &Arc<Vec<ProgramEntry>>) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.channels.rcu(|current| {
            current
                .iter()
                .map(|ch| {
                    if ch.id == id {
                        Arc::new(ch.with_schedule(Arc::clone(schedule)))
                    } else {
                        Arc::clone(ch)
                    }
                })
                .collect::<Vec<_>>()
        });
        true
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> CatalogSnapshot {
        self.channels.load_full()
    }

    pub fn get(&self, id: ChannelId) -> Option<Arc<Channel>> {
        self.channels.load().iter().find(|ch| ch.id == id).cloned()
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.load().iter().any(|ch| ch.id == id)
    }

    pub fn ids(&self) -> Vec<ChannelId> {
        self.channels.load().iter().map(|ch| ch.id).collect()
    }

    pub fn len(&self) -> usize {
        self.channels.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.load().is_empty()
    }

    /// All five buckets in display order, catalog order within each.
    ///
    /// Empty buckets are included so a menu can show them disabled.
    pub fn partition(&self) -> Vec<(Bucket, Vec<Arc<Channel>>)> {
        let channels = self.channels.load();
        Bucket::ALL
            .iter()
            .map(|&bucket| {
                let members = channels
                    .iter()
                    .filter(|ch| ch.bucket() == bucket)
                    .cloned()
                    .collect();
                (bucket, members)
            })
            .collect()
    }

    pub fn last_refreshed(&self) -> Option<DateTime<Utc>> {
        *self.last_refreshed.borrow()
    }

    /// Fires after every wholesale replacement.
    pub fn subscribe(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.last_refreshed.subscribe()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Attach every non-empty cached schedule to the matching channel, by id.
pub fn merge_schedules(channels: Vec<Channel>, cache: &ScheduleCache) -> Vec<Arc<Channel>> {
    channels
        .into_iter()
        .map(|mut ch| {
            let cached = cache.get(ch.id);
            if !cached.is_empty() {
                ch.schedule = cached;
            }
            Arc::new(ch)
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> ProgramEntry {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        ProgramEntry {
            program_id: Some(1),
            episode_id: None,
            title: "Morgonpasset".into(),
            description: String::new(),
            start,
            end: start + chrono::Duration::hours(1),
            image_url: String::new(),
        }
    }

    fn lineup() -> Vec<Channel> {
        vec![
            Channel::new(ChannelId::new(132), "P1"),
            Channel::new(ChannelId::new(164), "P3"),
            Channel::new(ChannelId::new(2576), "Sveriges Radio Finska"),
            Channel::new(ChannelId::new(212), "P4 Malmöhus"),
        ]
    }

    #[test]
    fn replace_merges_cached_schedules_by_id() {
        let cache = ScheduleCache::new();
        cache.replace(ChannelId::new(164), vec![entry()]);

        let catalog = Catalog::new();
        catalog.replace(lineup(), &cache);

        assert_eq!(catalog.get(ChannelId::new(164)).unwrap().schedule.len(), 1);
        assert!(catalog.get(ChannelId::new(132)).unwrap().schedule.is_empty());
        assert!(catalog.last_refreshed().is_some());
    }

    #[test]
    fn merge_uses_ids_not_previous_objects() {
        let cache = ScheduleCache::new();
        let catalog = Catalog::new();
        catalog.replace(lineup(), &cache);
        let before = catalog.get(ChannelId::new(132)).unwrap();

        cache.replace(ChannelId::new(132), vec![entry()]);
        catalog.replace(lineup(), &cache);
        let after = catalog.get(ChannelId::new(132)).unwrap();

        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(after.schedule.len(), 1);
    }

    #[test]
    fn attach_schedule_touches_one_channel() {
        let catalog = Catalog::new();
        catalog.replace(lineup(), &ScheduleCache::new());
        let untouched = catalog.get(ChannelId::new(132)).unwrap();

        assert!(catalog.attach_schedule(ChannelId::new(164), &Arc::new(vec![entry()])));
        assert!(!catalog.attach_schedule(ChannelId::new(9999), &Arc::new(vec![entry()])));

        assert_eq!(catalog.get(ChannelId::new(164)).unwrap().schedule.len(), 1);
        assert!(Arc::ptr_eq(&untouched, &catalog.get(ChannelId::new(132)).unwrap()));
    }

    #[test]
    fn partition_lists_every_bucket_in_order() {
        let catalog = Catalog::new();
        catalog.replace(lineup(), &ScheduleCache::new());
        let parts = catalog.partition();

        let buckets: Vec<_> = parts.iter().map(|(b, _)| *b).collect();
        assert_eq!(buckets, Bucket::ALL.to_vec());
        assert_eq!(parts[1].1.len(), 0); // P2
        assert_eq!(parts[3].1[0].name, "P4 Malmöhus");
        assert_eq!(parts[4].1[0].id, ChannelId::new(2576));
    }
}
