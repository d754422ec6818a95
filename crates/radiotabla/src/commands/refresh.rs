//! Manual "update" action: one bulk refresh, then its report.

use radiotabla_core::{ChannelId, Notice, RefreshReport};

use crate::cli::RefreshArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

fn ids(list: &[ChannelId]) -> String {
    if list.is_empty() {
        return "-".into();
    }
    list.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn detail(report: &RefreshReport) -> String {
    let catalog = match (report.catalog_size, report.catalog_failure) {
        (Some(size), _) => format!("{size} channels"),
        (None, Some(failure)) => format!("failed: {}", failure.user_message()),
        (None, None) => "-".into(),
    };
    let failed = if report.failed.is_empty() {
        "-".into()
    } else {
        report
            .failed
            .iter()
            .map(|f| format!("{} ({})", f.channel, f.failure))
            .collect::<Vec<_>>()
            .join(", ")
    };
    let elapsed = report.finished_at - report.started_at;

    format!(
        "Catalog:    {catalog}\n\
         Refreshed:  {}\n\
         Unchanged:  {}\n\
         Skipped:    {}\n\
         Failed:     {failed}\n\
         Tracked:    {}\n\
         Took:       {} ms",
        ids(&report.refreshed),
        ids(&report.unchanged),
        ids(&report.skipped),
        ids(&report.tracked),
        elapsed.num_milliseconds(),
    )
}

pub async fn handle(args: RefreshArgs, settings: &Settings) -> Result<(), CliError> {
    let coordinator = settings
        .start_coordinator(|c| {
            c.initial_refresh = false;
            c.refresh_interval = std::time::Duration::ZERO;
        })
        .await?;

    for raw in args.channels {
        let id = ChannelId::new(raw);
        // A failed first load leaves the channel tracked; the refresh retries it.
        if let Err(err) = util::select_and_wait(&coordinator, id).await {
            tracing::warn!(channel = %id, error = %err, "initial schedule load failed");
        }
    }

    let mut notices = coordinator.notices();
    let report = coordinator.refresh().await;
    coordinator.shutdown().await;
    let report = report?;

    let out = output::render_single(settings.output, &report, detail, |r| ids(&r.tracked))?;
    output::print_output(&out, settings.quiet);

    if report.is_success() {
        return Ok(());
    }
    let notice = util::find_notice(&mut notices, |n| {
        matches!(n, Notice::CatalogFailed { .. } | Notice::FetchFailed { .. })
    });
    Err(notice.map_or(
        CliError::Unexpected {
            detail: "refresh incomplete".into(),
        },
        util::notice_error,
    ))
}
