// ── Program schedule entries ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MISSING_PROGRAM_TITLE: &str = "MISSING PROGRAM TITLE";
pub const MISSING_PROGRAM_DESCRIPTION: &str = "MISSING PROGRAM DESCRIPTION";

/// Value reported for an absent program or episode id in the raw form.
pub const ABSENT_ID: i64 = -1;

/// One scheduled broadcast. Immutable once built by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgramEntry {
    pub program_id: Option<i64>,
    pub episode_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Empty when the service has no image for this entry.
    pub image_url: String,
}

/// Lookup identity of an entry: the episode when known, else the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProgramIdentity {
    Episode(i64),
    Program(i64),
}

impl ProgramEntry {
    pub fn identity(&self) -> Option<ProgramIdentity> {
        self.episode_id
            .map(ProgramIdentity::Episode)
            .or(self.program_id.map(ProgramIdentity::Program))
    }

    pub fn program_id_or_sentinel(&self) -> i64 {
        self.program_id.unwrap_or(ABSENT_ID)
    }

    pub fn episode_id_or_sentinel(&self) -> i64 {
        self.episode_id.unwrap_or(ABSENT_ID)
    }

    /// `true` while `now` falls inside `[start, end)`.
    pub fn is_airing(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now < self.end
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        self.end <= now
    }
}
