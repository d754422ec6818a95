//! Schedule display for one channel.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tabled::Tabled;

use radiotabla_core::{ChannelId, ProgramEntry};

use crate::cli::ScheduleArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::util;

// ── View ────────────────────────────────────────────────────────────

/// What `schedule` and `watch` print: one channel and its programs.
#[derive(Debug, Serialize)]
pub struct ScheduleView {
    pub channel: ChannelId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub programs: Vec<ProgramEntry>,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProgramRow {
    #[tabled(rename = "")]
    marker: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "End")]
    end: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl ProgramRow {
    fn new(entry: &ProgramEntry, now: DateTime<Utc>, today: NaiveDate, color: bool) -> Self {
        let marker = if entry.is_airing(now) {
            output::highlight("▶", color)
        } else {
            String::new()
        };
        Self {
            marker,
            start: util::local_time(entry.start, today),
            end: util::local_time(entry.end, today),
            title: entry.title.clone(),
            description: util::truncate(&entry.description),
        }
    }
}

/// Render a schedule view in the selected output format.
pub fn render(view: &ScheduleView, settings: &Settings) -> Result<String, CliError> {
    let color = settings.color;
    output::render_single(
        settings.output,
        view,
        |v| {
            let now = Utc::now();
            let today = Local::now().date_naive();
            let title = match &v.name {
                Some(name) => format!("{name} ({})", v.channel),
                None => format!("Channel {}", v.channel),
            };
            if v.programs.is_empty() {
                return format!("{}\nNo programs scheduled.", output::heading(&title, color));
            }
            let rows: Vec<ProgramRow> = v
                .programs
                .iter()
                .map(|p| ProgramRow::new(p, now, today, color))
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            format!("{}\n{table}", output::heading(&title, color))
        },
        |v| {
            v.programs
                .iter()
                .map(|p| format!("{}\t{}\t{}", p.start.to_rfc3339(), p.end.to_rfc3339(), p.title))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: ScheduleArgs, settings: &Settings) -> Result<(), CliError> {
    let id = settings.channel(args.channel)?;
    let date = args.date.as_deref().map(util::parse_date).transpose()?;

    let coordinator = settings
        .start_coordinator(|c| {
            c.initial_refresh = false;
            c.refresh_interval = std::time::Duration::ZERO;
        })
        .await?;

    let result = async {
        // The catalog gives the channel its name; a failed load only costs that.
        if let Err(err) = util::load_catalog(&coordinator).await {
            tracing::warn!(error = %err, "channel list unavailable");
        }
        util::ensure_known(&coordinator, id)?;

        let programs = match date {
            Some(day) => coordinator.fetch_schedule(id, Some(day)).await?,
            None => {
                let shown = util::select_and_wait(&coordinator, id).await?;
                shown.schedule.as_ref().clone()
            }
        };
        Ok::<_, CliError>(programs)
    }
    .await;
    let name = coordinator.catalog().get(id).map(|c| c.name.clone());
    coordinator.shutdown().await;

    let mut programs = result?;
    if args.upcoming {
        let now = Utc::now();
        programs.retain(|p| !p.has_ended(now));
    }

    let view = ScheduleView {
        channel: id,
        name,
        date,
        programs,
    };
    output::print_output(&render(&view, settings)?, settings.quiet);
    Ok(())
}
