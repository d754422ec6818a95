// ── API-to-domain type conversions ──
//
// Bridges raw `radiotabla_api` wire types into canonical
// `radiotabla_core::model` types. Missing text fields get their
// placeholder values here; records that cannot be placed on a timeline
// or identified at all are dropped.

use chrono::{DateTime, NaiveDateTime, Utc};

use radiotabla_api::sr::models::{RawChannel, RawScheduledEpisode};

use crate::model::channel::MISSING_CHANNEL_NAME;
use crate::model::program::{MISSING_PROGRAM_DESCRIPTION, MISSING_PROGRAM_TITLE};
use crate::model::{Channel, ChannelId, ProgramEntry};

/// Wire format of `starttimeutc` / `endtimeutc`.
const SR_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a service timestamp, `None` if absent or not in the wire format.
pub fn parse_sr_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?.trim();
    NaiveDateTime::parse_from_str(raw, SR_TIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Trimmed text, or `None` if absent or blank.
fn text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}

// ── Channel ────────────────────────────────────────────────────────

/// Convert a raw `<channel>`; channels without a usable id are skipped.
pub fn channel_from_raw(raw: RawChannel) -> Option<Channel> {
    let id = raw.id.and_then(|id| u32::try_from(id).ok())?;
    let mut channel = Channel::new(
        ChannelId::new(id),
        text(raw.name).unwrap_or_else(|| MISSING_CHANNEL_NAME.to_owned()),
    );
    channel.image_url = text(raw.image);
    channel.channel_type = text(raw.channeltype);
    channel.tagline = text(raw.tagline);
    Some(channel)
}

/// Convert a whole channel listing, preserving service order.
pub fn channels_from_raw(raw: Vec<RawChannel>) -> Vec<Channel> {
    raw.into_iter().filter_map(channel_from_raw).collect()
}

// ── Program ────────────────────────────────────────────────────────

/// Convert a raw `<scheduledepisode>`.
///
/// Returns `None` when neither a program id nor an episode id is present,
/// or when either timestamp is missing or malformed.
pub fn program_from_raw(raw: RawScheduledEpisode) -> Option<ProgramEntry> {
    let program_id = raw.program.as_ref().and_then(|p| p.id);
    let episode_id = raw.episodeid;
    if program_id.is_none() && episode_id.is_none() {
        return None;
    }

    let start = parse_sr_time(raw.starttimeutc.as_deref())?;
    let end = parse_sr_time(raw.endtimeutc.as_deref())?;

    Some(ProgramEntry {
        program_id,
        episode_id,
        title: text(raw.title).unwrap_or_else(|| MISSING_PROGRAM_TITLE.to_owned()),
        description: text(raw.description)
            .unwrap_or_else(|| MISSING_PROGRAM_DESCRIPTION.to_owned()),
        start,
        end,
        image_url: raw.imageurl.map(|s| s.trim().to_owned()).unwrap_or_default(),
    })
}
