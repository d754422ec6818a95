//! Shared helpers for command handlers.

use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::sync::broadcast;

use radiotabla_core::{
    ChannelId, Coordinator, CoreError, DisplayState, FetchState, Notice, RefreshReport, SrClient,
};

use crate::error::CliError;

const DESCRIPTION_WIDTH: usize = 60;

/// Turn a coordinator notice into the error shown to the user.
pub fn notice_error(notice: Notice) -> CliError {
    let (kind, detail) = match notice {
        Notice::FetchFailed {
            failure, detail, ..
        }
        | Notice::CatalogFailed { failure, detail }
        | Notice::RefreshFailed { failure, detail } => (failure, detail),
    };
    CoreError::Fetch { kind, detail }.into()
}

/// First buffered notice matching `pred`, if any.
pub fn find_notice(
    notices: &mut broadcast::Receiver<Notice>,
    mut pred: impl FnMut(&Notice) -> bool,
) -> Option<Notice> {
    while let Ok(notice) = notices.try_recv() {
        if pred(&notice) {
            return Some(notice);
        }
    }
    None
}

/// Run one bulk refresh and fail if the channel list could not be loaded.
pub async fn load_catalog(coordinator: &Coordinator<SrClient>) -> Result<RefreshReport, CliError> {
    let mut notices = coordinator.notices();
    let report = coordinator.refresh().await?;
    if report.catalog_failure.is_some() {
        let notice = find_notice(&mut notices, |n| matches!(n, Notice::CatalogFailed { .. }));
        return Err(notice.map_or(
            CliError::Unexpected {
                detail: "channel list unavailable".into(),
            },
            notice_error,
        ));
    }
    Ok(report)
}

/// Fail with `ChannelNotFound` if a loaded catalog lacks `id`.
pub fn ensure_known(coordinator: &Coordinator<SrClient>, id: ChannelId) -> Result<(), CliError> {
    let catalog = coordinator.catalog();
    if !catalog.is_empty() && !catalog.contains(id) {
        return Err(CoreError::ChannelNotFound { id: id.get() }.into());
    }
    Ok(())
}

/// Select `id` and wait until its fetch has settled.
///
/// Returns the display state once the schedule is shown, or the failure
/// reported for that channel.
pub async fn select_and_wait(
    coordinator: &Coordinator<SrClient>,
    id: ChannelId,
) -> Result<DisplayState, CliError> {
    let mut notices = coordinator.notices();
    let mut display = coordinator.display();
    coordinator.select(id).await?;

    let shown = display
        .wait_for(|d| d.selected == Some(id) && !d.is_loading())
        .await
        .ok_or(CliError::Stopped)?;
    if shown.state == FetchState::Fetched {
        return Ok(shown);
    }

    let notice = find_notice(
        &mut notices,
        |n| matches!(n, Notice::FetchFailed { channel, .. } if *channel == id),
    );
    Err(notice.map_or(
        CliError::Unexpected {
            detail: format!("schedule for channel {id} unavailable"),
        },
        notice_error,
    ))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| CliError::Validation {
        field: "date".into(),
        reason: format!("expected YYYY-MM-DD, got '{raw}'"),
    })
}

/// Local wall-clock time, with the weekday when it is not today.
pub fn local_time(at: DateTime<Utc>, today: NaiveDate) -> String {
    let local = at.with_timezone(&Local);
    if local.date_naive() == today {
        local.format("%H:%M").to_string()
    } else {
        local.format("%a %H:%M").to_string()
    }
}

/// Cut `text` to the table column width on a char boundary.
pub fn truncate(text: &str) -> String {
    if text.chars().count() <= DESCRIPTION_WIDTH {
        return text.to_owned();
    }
    let mut cut: String = text.chars().take(DESCRIPTION_WIDTH - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use radiotabla_core::FetchFailure;

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert!(parse_date("01/03/2024").is_err());
    }

    #[test]
    fn truncation_respects_multibyte_text() {
        let long = "å".repeat(80);
        let cut = truncate(&long);
        assert_eq!(cut.chars().count(), DESCRIPTION_WIDTH);
        assert!(cut.ends_with('…'));
        assert_eq!(truncate("Ekot"), "Ekot");
    }

    #[test]
    fn notices_map_to_matching_errors() {
        let err = notice_error(Notice::CatalogFailed {
            failure: FetchFailure::NetworkUnreachable,
            detail: "connection refused".into(),
        });
        assert!(matches!(err, CliError::NetworkUnreachable { .. }));
    }
}
