//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Application configuration discovery and loading."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chaos_monkey_logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::settings::Settings;

/// Application configuration: chaos monkey settings plus logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub chaos_monkey: Settings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "CHAOS_MONKEY_CONFIG";

    /// Load configuration from disk, respecting the `CHAOS_MONKEY_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    /// Load and validate a single configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse()
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.chaos_monkey
            .validate()
            .context("invalid [chaos_monkey] section")
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::settings::BoundaryKind;

    #[test]
    fn parses_sections() {
        let config = r#"
        [logging]
        format = "pretty"

        [chaos_monkey]
        enabled = true
        level = 2

        [chaos_monkey.watchers]
        rest_controller = true
        "#
        .parse::<AppConfig>()
        .unwrap();
        assert!(config.chaos_monkey.enabled);
        assert!(config
            .chaos_monkey
            .watchers
            .is_watched(BoundaryKind::RestController));
        assert_eq!(
            config.logging.format,
            chaos_monkey_logging::LogFormat::Pretty
        );
    }

    #[test]
    fn empty_document_is_transparent() {
        let config: AppConfig = "".parse().unwrap();
        assert!(!config.chaos_monkey.enabled);
    }

    #[test]
    fn invalid_section_is_rejected() {
        let err = "[chaos_monkey]\nlevel = 0".parse::<AppConfig>().unwrap_err();
        assert!(format!("{err:#}").contains("level must be between"));
    }

    #[test]
    fn loads_first_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("chaos.toml");
        let mut file = fs::File::create(&present).unwrap();
        writeln!(file, "[chaos_monkey]\nlevel = 7").unwrap();

        let missing = dir.path().join("missing.toml");
        let loaded = AppConfig::load_with_source(&[missing.clone(), present.clone()]).unwrap();
        assert_eq!(loaded.source, present);
        assert_eq!(loaded.config.chaos_monkey.level, 7);

        assert!(AppConfig::load(&[missing]).is_err());
    }
}
