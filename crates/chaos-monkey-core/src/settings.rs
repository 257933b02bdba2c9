//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Immutable, validated chaos monkey settings."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::fmt;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use tracing::debug;

use crate::error::ConfigError;
use crate::signature::CallSignature;

/// Upper bound accepted for [`Settings::level`].
pub const MAX_LEVEL: u32 = 10_000;

/// Table name used when settings are embedded in a larger configuration document.
pub const SETTINGS_TABLE: &str = "chaos_monkey";

const CUSTOM_PREFIX: &str = "custom:";

fn default_level() -> u32 {
    5
}

fn default_chosen_assaults() -> IndexSet<AssaultKind> {
    IndexSet::from([AssaultKind::Latency])
}

fn default_true() -> bool {
    true
}

fn default_latency_start() -> u64 {
    1000
}

fn default_latency_end() -> u64 {
    3000
}

fn default_error_type() -> String {
    "RuntimeError".to_owned()
}

fn default_error_message() -> String {
    "Chaos Monkey - RuntimeException".to_owned()
}

/// Failure mode applied to an eligible call.
///
/// Textual form: `latency`, `exception`, `kill-app` and `custom:<name>`.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub enum AssaultKind {
    Latency,
    Exception,
    KillApp,
    Custom(String),
}

impl AssaultKind {
    /// Convenience constructor for host-defined assaults.
    pub fn custom(name: impl Into<String>) -> Self {
        AssaultKind::Custom(name.into())
    }
}

impl fmt::Display for AssaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssaultKind::Latency => f.write_str("latency"),
            AssaultKind::Exception => f.write_str("exception"),
            AssaultKind::KillApp => f.write_str("kill-app"),
            AssaultKind::Custom(name) => write!(f, "{}{}", CUSTOM_PREFIX, name),
        }
    }
}

impl FromStr for AssaultKind {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if let Some(name) = trimmed.strip_prefix(CUSTOM_PREFIX) {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::UnknownAssault(input.to_owned()));
            }
            return Ok(AssaultKind::Custom(name.to_owned()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "latency" => Ok(AssaultKind::Latency),
            "exception" => Ok(AssaultKind::Exception),
            "kill-app" | "kill_app" | "killapp" => Ok(AssaultKind::KillApp),
            _ => Err(ConfigError::UnknownAssault(input.to_owned())),
        }
    }
}

/// Architectural boundary a host instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryKind {
    Controller,
    RestController,
    Service,
    Component,
    Repository,
}

impl BoundaryKind {
    /// Every boundary kind, in declaration order.
    pub const ALL: [BoundaryKind; 5] = [
        BoundaryKind::Controller,
        BoundaryKind::RestController,
        BoundaryKind::Service,
        BoundaryKind::Component,
        BoundaryKind::Repository,
    ];

    /// Static label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoundaryKind::Controller => "controller",
            BoundaryKind::RestController => "rest-controller",
            BoundaryKind::Service => "service",
            BoundaryKind::Component => "component",
            BoundaryKind::Repository => "repository",
        }
    }
}

impl fmt::Display for BoundaryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryKind {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalised = input.trim().to_ascii_lowercase().replace('_', "-");
        BoundaryKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalised)
            .ok_or_else(|| ConfigError::UnknownBoundary(input.to_owned()))
    }
}

/// Parameters of the latency assault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatencyProperties {
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_latency_start")]
    pub range_start_ms: u64,
    #[serde(default = "default_latency_end")]
    pub range_end_ms: u64,
}

impl LatencyProperties {
    /// Inclusive range of injected delays, in milliseconds.
    pub fn range_ms(&self) -> RangeInclusive<u64> {
        self.range_start_ms..=self.range_end_ms
    }
}

impl Default for LatencyProperties {
    fn default() -> Self {
        Self {
            active: true,
            range_start_ms: default_latency_start(),
            range_end_ms: default_latency_end(),
        }
    }
}

/// Parameters of the exception assault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionProperties {
    #[serde(default)]
    pub active: bool,
    #[serde(default = "default_error_type")]
    pub error_type: String,
    #[serde(default = "default_error_message")]
    pub message: String,
}

impl Default for ExceptionProperties {
    fn default() -> Self {
        Self {
            active: false,
            error_type: default_error_type(),
            message: default_error_message(),
        }
    }
}

/// Parameters of the kill-app assault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KillAppProperties {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub exit_code: i32,
}

/// Parameters handed to a host-registered assault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAssaultProperties {
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub parameters: IndexMap<String, String>,
}

impl Default for CustomAssaultProperties {
    fn default() -> Self {
        Self {
            active: true,
            parameters: IndexMap::new(),
        }
    }
}

/// Per-assault parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AssaultProperties {
    #[serde(default)]
    pub latency: LatencyProperties,
    #[serde(default)]
    pub exception: ExceptionProperties,
    #[serde(default)]
    pub kill_app: KillAppProperties,
    #[serde(default)]
    pub custom: IndexMap<String, CustomAssaultProperties>,
}

/// Which boundary kinds are watched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherProperties {
    #[serde(default)]
    pub controller: bool,
    #[serde(default)]
    pub rest_controller: bool,
    #[serde(default = "default_true")]
    pub service: bool,
    #[serde(default)]
    pub component: bool,
    #[serde(default = "default_true")]
    pub repository: bool,
}

impl WatcherProperties {
    pub fn is_watched(&self, boundary: BoundaryKind) -> bool {
        match boundary {
            BoundaryKind::Controller => self.controller,
            BoundaryKind::RestController => self.rest_controller,
            BoundaryKind::Service => self.service,
            BoundaryKind::Component => self.component,
            BoundaryKind::Repository => self.repository,
        }
    }

    pub fn set(&mut self, boundary: BoundaryKind, watched: bool) {
        let flag = match boundary {
            BoundaryKind::Controller => &mut self.controller,
            BoundaryKind::RestController => &mut self.rest_controller,
            BoundaryKind::Service => &mut self.service,
            BoundaryKind::Component => &mut self.component,
            BoundaryKind::Repository => &mut self.repository,
        };
        *flag = watched;
    }
}

impl Default for WatcherProperties {
    fn default() -> Self {
        Self {
            controller: false,
            rest_controller: false,
            service: true,
            component: false,
            repository: true,
        }
    }
}

/// Complete chaos monkey configuration.
///
/// Settings are never edited in place once published: the
/// [`SettingsHandle`](crate::SettingsHandle) swaps whole validated snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Master switch. When off every boundary notification is a no-op.
    #[serde(default)]
    pub enabled: bool,
    /// One in `level` watched calls is eligible for an assault.
    #[serde(default = "default_level")]
    pub level: u32,
    /// Assaults the engine may pick from.
    #[serde(default = "default_chosen_assaults")]
    pub chosen_assaults: IndexSet<AssaultKind>,
    /// Restricts assaults to these call sites (`Type.method` or `Type`) when non-empty.
    #[serde(default)]
    pub watched_custom_services: Vec<String>,
    #[serde(default)]
    pub assaults: AssaultProperties,
    #[serde(default)]
    pub watchers: WatcherProperties,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: false,
            level: default_level(),
            chosen_assaults: default_chosen_assaults(),
            watched_custom_services: Vec::new(),
            assaults: AssaultProperties::default(),
            watchers: WatcherProperties::default(),
        }
    }
}

impl Settings {
    /// Load and validate settings from a TOML file.
    ///
    /// The file may either be a bare settings document or an application
    /// configuration carrying a `[chaos_monkey]` table.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!(settings_path = %path.display(), "loading chaos monkey settings");
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.level < 1 || self.level > MAX_LEVEL {
            return Err(ConfigError::InvalidLevel {
                level: self.level,
                max: MAX_LEVEL,
            });
        }
        let latency = &self.assaults.latency;
        if latency.range_start_ms > latency.range_end_ms {
            return Err(ConfigError::InvalidLatencyRange {
                start: latency.range_start_ms,
                end: latency.range_end_ms,
            });
        }
        if self.enabled && self.chosen_assaults.is_empty() {
            return Err(ConfigError::NoAssaultChosen);
        }
        for kind in &self.chosen_assaults {
            if let AssaultKind::Custom(name) = kind {
                if !self.assaults.custom.contains_key(name) {
                    return Err(ConfigError::MissingCustomAssault(name.clone()));
                }
            }
        }
        if self.assaults.exception.error_type.trim().is_empty() {
            return Err(ConfigError::EmptyErrorType);
        }
        Ok(())
    }

    /// Whether `kind` is chosen and its own `active` flag is set.
    pub fn is_assault_active(&self, kind: &AssaultKind) -> bool {
        if !self.chosen_assaults.contains(kind) {
            return false;
        }
        match kind {
            AssaultKind::Latency => self.assaults.latency.active,
            AssaultKind::Exception => self.assaults.exception.active,
            AssaultKind::KillApp => self.assaults.kill_app.active,
            AssaultKind::Custom(name) => self
                .assaults
                .custom
                .get(name)
                .map(|props| props.active)
                .unwrap_or(false),
        }
    }

    /// Whether the call site passes the `watched_custom_services` restriction.
    pub fn is_watched_service(&self, signature: &CallSignature) -> bool {
        if self.watched_custom_services.is_empty() {
            return true;
        }
        let qualified = signature.qualified_name();
        self.watched_custom_services
            .iter()
            .any(|entry| entry == &qualified || entry == signature.declaring_type())
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut document: toml::Table = toml::from_str(input)?;
        let settings: Settings = match document.remove(SETTINGS_TABLE) {
            Some(table) => table.try_into()?,
            None => toml::Value::Table(document).try_into()?,
        };
        settings.validate()?;
        Ok(settings)
    }
}
