//! CLI flag resolution over the loaded config file, and construction of
//! the schedule client and coordinator.
//!
//! Flags win over `RADIOTABLA_*` env vars, which win over the TOML file.

use std::time::Duration;

use clap::ValueEnum;
use url::Url;

use radiotabla_config::Config;
use radiotabla_core::{
    ChannelId, Coordinator, CoordinatorConfig, CoreError, SrClient,
};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Everything a command handler needs besides its own arguments.
#[derive(Debug)]
pub struct Settings {
    pub config: Config,
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
    api_url: Option<String>,
    timeout: Option<u64>,
}

impl Settings {
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = radiotabla_config::load_config()?;
        Self::with_config(global, config)
    }

    pub fn with_config(global: &GlobalOpts, config: Config) -> Result<Self, CliError> {
        let output = match global.output {
            Some(format) => format,
            None => parse_value("defaults.output", &config.defaults.output)?,
        };
        let color_mode = match global.color {
            Some(mode) => mode,
            None => parse_value::<ColorMode>("defaults.color", &config.defaults.color)?,
        };
        if global.timeout == Some(0) {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            output,
            color: output::should_color(color_mode),
            quiet: global.quiet,
            api_url: global.api_url.clone(),
            timeout: global.timeout,
            config,
        })
    }

    /// The channel named on the command line, else the configured favorite.
    pub fn channel(&self, arg: Option<u32>) -> Result<ChannelId, CliError> {
        arg.map(ChannelId::new)
            .or_else(|| self.config.favorite())
            .ok_or(CliError::NoChannel)
    }

    /// HTTP client for the configured (or overridden) service.
    pub fn client(&self) -> Result<SrClient, CliError> {
        let url = match &self.api_url {
            Some(raw) => raw.parse::<Url>().map_err(|_| CliError::Validation {
                field: "api-url".into(),
                reason: format!("invalid URL: {raw}"),
            })?,
            None => self.config.api_url()?,
        };

        let mut transport = self.config.transport_config()?;
        if let Some(secs) = self.timeout {
            transport = transport.with_timeout(Duration::from_secs(secs));
        }
        tracing::debug!(url = %url, timeout_secs = transport.timeout.as_secs(), "schedule client");
        SrClient::new(url, &transport).map_err(|e| CliError::from(CoreError::from(e)))
    }

    /// Coordinator pacing from config, with `--timeout` applied per fetch.
    pub fn coordinator_config(&self) -> Result<CoordinatorConfig, CliError> {
        let mut coordinator = self.config.coordinator_config()?;
        if let Some(secs) = self.timeout {
            coordinator.fetch_timeout = Duration::from_secs(secs);
        }
        Ok(coordinator)
    }

    /// Build and start a coordinator, letting the caller adjust its pacing.
    pub async fn start_coordinator(
        &self,
        adjust: impl FnOnce(&mut CoordinatorConfig),
    ) -> Result<Coordinator<SrClient>, CliError> {
        let mut coordinator_config = self.coordinator_config()?;
        adjust(&mut coordinator_config);
        let coordinator = Coordinator::new(self.client()?, coordinator_config);
        coordinator.start().await?;
        Ok(coordinator)
    }
}

fn parse_value<T: ValueEnum>(field: &str, raw: &str) -> Result<T, CliError> {
    T::from_str(raw, true).map_err(|_| CliError::Validation {
        field: field.into(),
        reason: format!("unknown value '{raw}'"),
    })
}
