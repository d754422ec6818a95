//! Channel listing, grouped by display bucket.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use radiotabla_core::{Bucket, Channel, ChannelId};

use crate::cli::{BucketArg, ChannelsArgs};
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

// ── Listing ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChannelListing {
    bucket: Bucket,
    id: ChannelId,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tagline: Option<String>,
}

impl ChannelListing {
    fn new(bucket: Bucket, channel: &Channel) -> Self {
        Self {
            bucket,
            id: channel.id,
            name: channel.name.clone(),
            channel_type: channel.channel_type.clone(),
            tagline: channel.tagline.clone(),
        }
    }
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ChannelRow {
    #[tabled(rename = "Group")]
    bucket: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    channel_type: String,
}

impl ChannelRow {
    fn new(c: &ChannelListing) -> Self {
        Self {
            bucket: c.bucket.to_string(),
            id: c.id.to_string(),
            name: c.name.clone(),
            channel_type: c.channel_type.clone().unwrap_or_default(),
        }
    }
}

fn to_bucket(arg: BucketArg) -> Bucket {
    match arg {
        BucketArg::P1 => Bucket::P1,
        BucketArg::P2 => Bucket::P2,
        BucketArg::P3 => Bucket::P3,
        BucketArg::P4 => Bucket::P4,
        BucketArg::Other => Bucket::Other,
    }
}

fn listings(groups: Vec<(Bucket, Vec<Arc<Channel>>)>, only: Option<Bucket>) -> Vec<ChannelListing> {
    groups
        .into_iter()
        .filter(|(bucket, _)| only.is_none_or(|b| b == *bucket))
        .flat_map(|(bucket, channels)| {
            channels
                .into_iter()
                .map(move |channel| ChannelListing::new(bucket, &channel))
        })
        .collect()
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ChannelsArgs, settings: &Settings) -> Result<(), CliError> {
    let coordinator = settings
        .start_coordinator(|c| {
            c.initial_refresh = false;
            c.refresh_interval = std::time::Duration::ZERO;
        })
        .await?;

    let result = util::load_catalog(&coordinator).await;
    let groups = coordinator.catalog().partition();
    coordinator.shutdown().await;
    result?;

    let data = listings(groups, args.bucket.map(to_bucket));
    let out = output::render_list(
        settings.output,
        &data,
        ChannelRow::new,
        |c| c.id.to_string(),
    )?;
    output::print_output(&out, settings.quiet);
    Ok(())
}
