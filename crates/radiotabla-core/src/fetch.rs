// ── Schedule fetch ──
//
// The fallible "go ask the service" step. `ScheduleSource` is the seam
// between the coordinator and the network; `fetch_schedule` turns one
// or more day pages into the schedule the cache stores.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike, Utc};
use futures_util::future::try_join_all;

use radiotabla_api::SrClient;

use crate::convert::{channels_from_raw, program_from_raw};
use crate::error::CoreError;
use crate::model::{Channel, ChannelId, ProgramEntry};
use crate::window::RelevanceWindow;

/// Local hour at and after which the window looks ahead to tomorrow.
const LOOK_AHEAD_HOUR: u32 = 12;

/// Remote provider of channel listings and day schedules.
pub trait ScheduleSource: Send + Sync + 'static {
    /// The full channel catalog.
    fn fetch_catalog(&self) -> impl Future<Output = Result<Vec<Channel>, CoreError>> + Send;

    /// Every decodable entry for one channel on one calendar date.
    fn fetch_day(
        &self,
        id: ChannelId,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<ProgramEntry>, CoreError>> + Send;
}

impl ScheduleSource for SrClient {
    async fn fetch_catalog(&self) -> Result<Vec<Channel>, CoreError> {
        let raw = self.list_channels().await?;
        Ok(channels_from_raw(raw))
    }

    async fn fetch_day(
        &self,
        id: ChannelId,
        date: NaiveDate,
    ) -> Result<Vec<ProgramEntry>, CoreError> {
        let raw = self.scheduled_episodes(id.get(), date).await?;
        Ok(raw.into_iter().filter_map(program_from_raw).collect())
    }
}

/// Calendar dates needed to cover the relevance window around `now_local`.
///
/// From noon on, today and tomorrow; before noon, yesterday and today.
pub fn fetch_dates(now_local: NaiveDateTime) -> Vec<NaiveDate> {
    let today = now_local.date();
    let pair = if now_local.hour() >= LOOK_AHEAD_HOUR {
        [Some(today), today.succ_opt()]
    } else {
        [today.pred_opt(), Some(today)]
    };
    pair.into_iter().flatten().collect()
}

/// Fetch one channel's schedule.
///
/// With no `date`, the days from [`fetch_dates`] are fetched concurrently;
/// with an explicit `date`, only that day's page. Either way the result is
/// cut to the relevance window around `now`. Any failed day fails the
/// whole fetch; a half-fetched window is never returned.
pub async fn fetch_schedule<S: ScheduleSource>(
    source: &S,
    id: ChannelId,
    date: Option<NaiveDate>,
    now: DateTime<FixedOffset>,
) -> Result<Vec<ProgramEntry>, CoreError> {
    let dates = match date {
        Some(day) => vec![day],
        None => fetch_dates(now.naive_local()),
    };
    let window = RelevanceWindow::around(now.with_timezone(&Utc));

    let requests: Vec<_> = dates
        .into_iter()
        .map(|day| source.fetch_day(id, day))
        .collect();
    let days = try_join_all(requests).await?;

    Ok(window.apply(days.into_iter().flatten().collect()))
}

/// Bound `fut` by `limit`; an elapsed timer becomes [`CoreError::Timeout`].
pub async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, CoreError>>,
) -> Result<T, CoreError> {
    tokio::time::timeout(limit, fut)
        .await
        .unwrap_or_else(|_| {
            Err(CoreError::Timeout {
                timeout_secs: limit.as_secs(),
            })
        })
}
