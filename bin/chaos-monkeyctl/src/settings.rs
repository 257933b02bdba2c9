//! ---
//! cm_section: "08-operator-tooling"
//! cm_subsection: "binary"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Settings inspection subcommands."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chaos_monkey_core::{AppConfig, LoadedAppConfig, Status};
use clap::{Args, ValueEnum};

/// Locations probed when neither `--config` nor `CHAOS_MONKEY_CONFIG` is given.
pub const DEFAULT_CANDIDATES: &[&str] = &["chaos-monkey.toml", "config/chaos-monkey.toml"];

/// Resolve the configuration from an explicit path or the default discovery order.
pub fn load_config(path: Option<&Path>) -> Result<LoadedAppConfig> {
    match path {
        Some(path) => Ok(LoadedAppConfig {
            config: AppConfig::from_path(path)?,
            source: path.to_path_buf(),
        }),
        None => AppConfig::load_with_source(DEFAULT_CANDIDATES),
    }
}

#[derive(Debug, Args)]
pub struct ValidateCommand {
    /// Configuration file (falls back to CHAOS_MONKEY_CONFIG, then ./chaos-monkey.toml).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl ValidateCommand {
    pub fn execute(self) -> Result<()> {
        let loaded = load_config(self.config.as_deref())?;
        let settings = &loaded.config.chaos_monkey;
        let status = Status::of(settings);
        println!("{}: configuration OK", loaded.source.display());
        println!("status: {status}");
        println!("level: {}", settings.level);
        println!(
            "chosen assaults: {}",
            settings
                .chosen_assaults
                .iter()
                .map(|kind| kind.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Toml,
}

#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Configuration file (falls back to CHAOS_MONKEY_CONFIG, then ./chaos-monkey.toml).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format for the effective settings.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

impl ShowCommand {
    pub fn execute(self) -> Result<()> {
        let loaded = load_config(self.config.as_deref())?;
        let settings = &loaded.config.chaos_monkey;
        let rendered = match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(settings).context("failed to render settings")?
            }
            OutputFormat::Toml => {
                toml::to_string_pretty(settings).context("failed to render settings")?
            }
        };
        println!("{rendered}");
        Ok(())
    }
}
