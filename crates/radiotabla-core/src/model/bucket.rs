// ── Display buckets ──
//
// Channels are grouped for display by a name token. The first of
// P1..P4 found anywhere in the name wins; everything else is `Other`.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Bucket {
    P1,
    P2,
    P3,
    P4,
    Other,
}

impl Bucket {
    /// All buckets in display order.
    pub const ALL: [Self; 5] = [Self::P1, Self::P2, Self::P3, Self::P4, Self::Other];

    const TOKENS: [(&'static str, Self); 4] = [
        ("P1", Self::P1),
        ("P2", Self::P2),
        ("P3", Self::P3),
        ("P4", Self::P4),
    ];

    /// Bucket for a channel name: exact, case-sensitive substring match.
    pub fn for_name(name: &str) -> Self {
        Self::TOKENS
            .iter()
            .find(|(token, _)| name.contains(token))
            .map_or(Self::Other, |(_, bucket)| *bucket)
    }
}
