// SR API wire types
//
// Raw shapes of the `<sr>` XML documents. Everything the service might
// leave out is optional or defaulted; normalization into domain types
// happens in `radiotabla-core`, not here.

use serde::Deserialize;

// ── Channels ─────────────────────────────────────────────────────────

/// Document returned by `GET channels`.
///
/// ```xml
/// <sr>
///   <channels>
///     <channel id="164" name="P3">
///       <image>https://...</image>
///       <channeltype>Rikskanal</channeltype>
///     </channel>
///   </channels>
/// </sr>
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct ChannelsDocument {
    #[serde(default)]
    pub channels: ChannelList,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChannelList {
    #[serde(default, rename = "channel")]
    pub items: Vec<RawChannel>,
}

/// One `<channel>` element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawChannel {
    #[serde(default, rename = "@id")]
    pub id: Option<i64>,
    #[serde(default, rename = "@name")]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub siteurl: Option<String>,
    #[serde(default)]
    pub channeltype: Option<String>,
}

// ── Schedule ─────────────────────────────────────────────────────────

/// Document returned by `GET scheduledepisodes`.
#[derive(Debug, Default, Deserialize)]
pub struct ScheduleDocument {
    #[serde(default)]
    pub schedule: ScheduleList,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScheduleList {
    #[serde(default, rename = "scheduledepisode")]
    pub items: Vec<RawScheduledEpisode>,
}

/// One `<scheduledepisode>` element.
///
/// Times are kept as the raw strings the service sent; parsing (and
/// dropping entries whose times do not parse) is the decoder's job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawScheduledEpisode {
    #[serde(default)]
    pub episodeid: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub program: Option<RawProgramRef>,
    #[serde(default)]
    pub starttimeutc: Option<String>,
    #[serde(default)]
    pub endtimeutc: Option<String>,
    #[serde(default)]
    pub imageurl: Option<String>,
}

/// `<program id=".." name=".."/>` reference inside a scheduled episode.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProgramRef {
    #[serde(default, rename = "@id")]
    pub id: Option<i64>,
    #[serde(default, rename = "@name")]
    pub name: Option<String>,
}
