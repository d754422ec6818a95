//! Live schedule view: selection plus periodic bulk refresh until Ctrl-C.

use std::time::Duration;

use chrono::Local;
use tokio::sync::broadcast::error::RecvError;

use radiotabla_core::FetchState;

use crate::cli::WatchArgs;
use crate::config::Settings;
use crate::error::CliError;
use crate::output;

use super::schedule::{self, ScheduleView};
use super::util;

pub async fn handle(args: WatchArgs, settings: &Settings) -> Result<(), CliError> {
    let id = settings.channel(args.channel)?;
    if args.interval == Some(0) {
        return Err(CliError::Validation {
            field: "interval".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let coordinator = settings
        .start_coordinator(|c| {
            // The first catalog load happens below, before selecting.
            c.initial_refresh = false;
            if let Some(secs) = args.interval {
                c.refresh_interval = Duration::from_secs(secs);
                c.max_backoff = c.max_backoff.max(c.refresh_interval);
            }
        })
        .await?;

    if let Err(err) = util::load_catalog(&coordinator).await {
        tracing::warn!(error = %err, "channel list unavailable");
    }
    if let Err(err) = util::ensure_known(&coordinator, id) {
        coordinator.shutdown().await;
        return Err(err);
    }

    let mut display = coordinator.display();
    let mut notices = coordinator.notices();
    if let Err(err) = coordinator.select(id).await {
        coordinator.shutdown().await;
        return Err(err.into());
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                if let Err(err) = signal {
                    tracing::warn!(error = %err, "could not listen for Ctrl-C");
                }
                break Ok(());
            }
            state = display.changed() => {
                let Some(state) = state else { break Err(CliError::Stopped) };
                if state.selected != Some(id) || state.state != FetchState::Fetched {
                    continue;
                }
                let view = ScheduleView {
                    channel: id,
                    name: state.channel.as_ref().map(|c| c.name.clone()),
                    date: None,
                    programs: state.schedule.as_ref().clone(),
                };
                if !settings.quiet {
                    eprintln!("── updated {} ──", Local::now().format("%H:%M:%S"));
                }
                match schedule::render(&view, settings) {
                    Ok(out) => output::print_output(&out, settings.quiet),
                    Err(err) => break Err(err),
                }
            }
            notice = notices.recv() => match notice {
                Ok(notice) => eprintln!("{}", output::warning(&notice.to_string(), settings.color)),
                Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "notices lagged"),
                Err(RecvError::Closed) => break Err(CliError::Stopped),
            }
        }
    };

    coordinator.shutdown().await;
    result
}
