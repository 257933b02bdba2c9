//! ---
//! cm_section: "03-logging"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Structured logging adapters and sinks."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
#![warn(missing_docs)]

use std::path::PathBuf;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

pub mod macros;

/// Environment variable holding the preferred filter directive.
pub const LOG_ENV: &str = "CHAOS_MONKEY_LOG";

static FILE_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static STDOUT_GUARD: OnceCell<WorkerGuard> = OnceCell::new();

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The configured log directory could not be created.
    #[error("unable to create log directory {path}: {source}")]
    Directory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Available output formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    StructuredJson,
    /// Human readable output for terminals.
    Pretty,
}

/// Logging section of the application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LoggingConfig {
    /// Directory for a daily rolling JSON log file. Stdout only when absent.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Format used for the stdout layer.
    #[serde(default)]
    pub format: LogFormat,
    /// Optional prefix for rolling log file names.
    #[serde(default)]
    pub file_prefix: Option<String>,
}

/// Initialize a baseline stderr subscriber suitable for development and CLIs.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Initialize the tracing subscriber based on configuration and environment variables.
///
/// * `CHAOS_MONKEY_LOG` overrides the filter (e.g. `info`, `chaos_monkey=debug`).
///   When unset the standard `RUST_LOG` variable is honoured, finally defaulting to
///   `info`.
/// * A daily rolling JSON file is written next to stdout when `directory` is set.
///
/// Calling this more than once is harmless; only the first subscriber is installed.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<(), LoggingError> {
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let _ = STDOUT_GUARD.set(stdout_guard);

    let file_layer = match &config.directory {
        Some(directory) => {
            std::fs::create_dir_all(directory).map_err(|source| LoggingError::Directory {
                path: directory.clone(),
                source,
            })?;
            let prefix = config
                .file_prefix
                .clone()
                .unwrap_or_else(|| service_name.to_owned());
            let appender = daily(directory, format!("{}-{}.log", prefix, service_name));
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(file_guard);
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_timer(fmt::time::UtcTime::rfc_3339())
                    .json()
                    .with_writer(file_writer)
                    .boxed(),
            )
        }
        None => None,
    };

    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!(
                "invalid {} directive ({}); defaulting to info logging",
                LOG_ENV, err
            );
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let fmt_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .json()
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer)
        .try_init()
        .ok();

    info!(
        service = %service_name,
        log_dir = ?config.directory,
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}

/// Structured context attached to assault log events.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Boundary kind of the intercepted call (`service`, `repository`, ...).
    pub boundary: Option<&'a str>,
    /// Qualified call site, `Type.method`.
    pub signature: Option<&'a str>,
    /// Assault kind label.
    pub assault: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a boundary kind.
    pub fn with_boundary(mut self, boundary: &'a str) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Attach a call signature.
    pub fn with_signature(mut self, signature: &'a str) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Attach an assault kind.
    pub fn with_assault(mut self, assault: &'a str) -> Self {
        self.assault = Some(assault);
        self
    }
}

/// Outcome recorded for an assault lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssaultOutcome {
    /// The assault was launched against the call.
    Launched,
    /// The assault was skipped because of an infrastructure problem.
    Skipped,
    /// The assault ends the process.
    Fatal,
}

impl AssaultOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            AssaultOutcome::Launched => "launched",
            AssaultOutcome::Skipped => "skipped",
            AssaultOutcome::Fatal => "fatal",
        }
    }
}

/// Emit a standardized assault event.
pub fn log_assault_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: AssaultOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    // `tracing::event!` needs a constant level, so branch per outcome.
    match outcome {
        AssaultOutcome::Launched => tracing::event!(
            Level::INFO,
            event,
            outcome = outcome.as_str(),
            boundary = ctx.boundary.unwrap_or(""),
            signature = ctx.signature.unwrap_or(""),
            assault = ctx.assault.unwrap_or(""),
            message = %message
        ),
        AssaultOutcome::Skipped => tracing::event!(
            Level::WARN,
            event,
            outcome = outcome.as_str(),
            boundary = ctx.boundary.unwrap_or(""),
            signature = ctx.signature.unwrap_or(""),
            assault = ctx.assault.unwrap_or(""),
            message = %message
        ),
        AssaultOutcome::Fatal => tracing::event!(
            Level::ERROR,
            event,
            outcome = outcome.as_str(),
            boundary = ctx.boundary.unwrap_or(""),
            signature = ctx.signature.unwrap_or(""),
            assault = ctx.assault.unwrap_or(""),
            message = %message
        ),
    }
}
