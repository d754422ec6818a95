// ── Channel identity and catalog entries ──

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::bucket::Bucket;
use super::program::ProgramEntry;

/// Placeholder name for channels the service lists without one.
pub const MISSING_CHANNEL_NAME: &str = "MISSING CHANNEL NAME";

// ── ChannelId ───────────────────────────────────────────────────────

/// Stable numeric channel identifier, as assigned by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(u32);

impl ChannelId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ChannelId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u32> for ChannelId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

// ── Channel ─────────────────────────────────────────────────────────

/// One channel in the catalog.
///
/// The catalog owns channels; a channel's `schedule` is replaced
/// wholesale whenever a fresh schedule for its id is merged in, never
/// patched entry by entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(default)]
    pub schedule: Arc<Vec<ProgramEntry>>,
}

impl Channel {
    /// A channel with an empty schedule.
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image_url: None,
            channel_type: None,
            tagline: None,
            schedule: Arc::new(Vec::new()),
        }
    }

    /// Display bucket this channel is grouped under.
    pub fn bucket(&self) -> Bucket {
        Bucket::for_name(&self.name)
    }

    /// A copy of this channel carrying `schedule` instead of its own.
    pub fn with_schedule(&self, schedule: Arc<Vec<ProgramEntry>>) -> Self {
        Self {
            schedule,
            ..self.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn channel_id_parses_with_whitespace() {
        assert_eq!(" 132 ".parse::<ChannelId>().unwrap(), ChannelId::new(132));
        assert!("P1".parse::<ChannelId>().is_err());
    }

    #[test]
    fn channel_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ChannelId::new(164)).unwrap();
        assert_eq!(json, "164");
    }

    #[test]
    fn with_schedule_keeps_metadata() {
        let mut ch = Channel::new(ChannelId::new(132), "P1");
        ch.tagline = Some("Lyssnarna i fokus".into());
        let updated = ch.with_schedule(Arc::new(Vec::new()));
        assert_eq!(updated.tagline, ch.tagline);
        assert_eq!(updated.bucket(), Bucket::P1);
    }
}
