// ── Relevance window ──
//
// Keeps only the part of a schedule that matters "now": entries fully
// contained in the twelve hours either side of the reference instant.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::model::ProgramEntry;

/// Half-width of the relevance window.
pub const RELEVANCE_HALF_WIDTH_HOURS: i64 = 12;

/// The closed interval `[now − 12h, now + 12h]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RelevanceWindow {
    pub fn around(now: DateTime<Utc>) -> Self {
        let half = Duration::hours(RELEVANCE_HALF_WIDTH_HOURS);
        Self {
            start: now - half,
            end: now + half,
        }
    }

    /// `true` iff the entry starts and ends inside the window (bounds inclusive).
    pub fn contains(&self, entry: &ProgramEntry) -> bool {
        entry.start >= self.start && entry.end <= self.end
    }

    /// Filter to the window, then order and de-duplicate.
    pub fn apply(&self, entries: Vec<ProgramEntry>) -> Vec<ProgramEntry> {
        normalize(entries.into_iter().filter(|e| self.contains(e)).collect())
    }
}

/// Sort by start time and drop repeats of the same `(identity, start)`.
///
/// Adjacent day pages can both list a program that spans midnight.
pub fn normalize(mut entries: Vec<ProgramEntry>) -> Vec<ProgramEntry> {
    entries.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert((e.identity(), e.start)));
    entries
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 0, 0).unwrap()
    }

    fn entry(episode: i64, start_h: i64, len_h: i64) -> ProgramEntry {
        let start = now() + Duration::hours(start_h);
        ProgramEntry {
            program_id: Some(1),
            episode_id: Some(episode),
            title: format!("ep {episode}"),
            description: String::new(),
            start,
            end: start + Duration::hours(len_h),
            image_url: String::new(),
        }
    }

    #[test]
    fn keeps_only_fully_contained_entries() {
        let w = RelevanceWindow::around(now());
        let kept = w.apply(vec![
            entry(1, -13, 2), // starts before window
            entry(2, -12, 1), // starts exactly on the lower bound
            entry(3, 0, 1),
            entry(4, 11, 1), // ends exactly on the upper bound
            entry(5, 11, 2), // ends after window
        ]);
        let ids: Vec<_> = kept.iter().map(|e| e.episode_id.unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn every_kept_entry_overlaps_now_plus_minus_twelve() {
        let w = RelevanceWindow::around(now());
        let input: Vec<_> = (-30..30).map(|h| entry(h, h, 3)).collect();
        for e in w.apply(input) {
            assert!(e.start <= now() + Duration::hours(12));
            assert!(e.end >= now() - Duration::hours(12));
        }
    }

    #[test]
    fn normalize_sorts_and_dedupes() {
        let out = normalize(vec![entry(3, 2, 1), entry(1, 0, 1), entry(3, 2, 1)]);
        let ids: Vec<_> = out.iter().map(|e| e.episode_id.unwrap()).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}
