//! ---
//! cm_section: "08-operator-tooling"
//! cm_subsection: "binary"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Local drills driving synthetic boundary calls through the engine."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chaos_monkey_core::{
    new_registry, render_text, BoundaryKind, BoundaryWatcher, ChaosMetrics,
    ChaosMonkey, KillSwitch, MetricEvent, MetricEventPublisher, ProcessTerminator, RandomSource,
    SeededRandom, SettingsHandle, Terminator, ThreadRandom,
};
use chaos_monkey_logging::cm_warn;
use clap::Args;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;

use crate::settings::load_config;

#[derive(Debug, Args)]
pub struct DrillCommand {
    /// Configuration file (falls back to CHAOS_MONKEY_CONFIG, then ./chaos-monkey.toml).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Boundary kind the synthetic calls enter.
    #[arg(long, value_name = "KIND", default_value = "service")]
    boundary: BoundaryKind,

    /// Declaring type of the synthetic call site.
    #[arg(long = "type", value_name = "TYPE", default_value = "drill::Target")]
    declaring_type: String,

    /// Method name of the synthetic call site.
    #[arg(long, value_name = "NAME", default_value = "call")]
    method: String,

    /// Number of synthetic calls.
    #[arg(long, default_value_t = 1_000)]
    iterations: u64,

    /// Seed for a reproducible drill.
    #[arg(long)]
    seed: Option<u64>,

    /// Enable the monkey for the drill even if the configuration has it switched off.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    force_enable: bool,

    /// Upper bound applied to injected latency. The configured range is used as is when absent.
    #[arg(long = "latency-cap-ms", value_name = "MS")]
    latency_cap_ms: Option<u64>,

    /// Let a kill-app assault really terminate this process.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    allow_kill: bool,

    /// Append the Prometheus text exposition after the report.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    metrics: bool,
}

/// Outcome distribution of a drill.
#[derive(Debug, Default, Clone, Serialize)]
pub struct DrillReport {
    pub iterations: u64,
    pub watcher_calls: u64,
    pub eligible: u64,
    pub assaulted: u64,
    pub failures: u64,
    pub kill_requests: u64,
    pub latency_ms_total: u64,
    pub assaults: IndexMap<String, u64>,
    pub errors: IndexMap<String, u64>,
}

/// Publisher that tallies events into a [`DrillReport`] and optionally forwards them.
#[derive(Debug)]
struct DrillRecorder {
    report: Mutex<DrillReport>,
    forward: Option<ChaosMetrics>,
}

impl MetricEventPublisher for DrillRecorder {
    fn publish(&self, event: &MetricEvent<'_>) -> Result<()> {
        {
            let mut report = self.report.lock();
            match event {
                MetricEvent::WatcherCall { .. } => report.watcher_calls += 1,
                MetricEvent::RequestEligible { .. } => report.eligible += 1,
                MetricEvent::Assault { assault, .. } => {
                    report.assaulted += 1;
                    *report.assaults.entry(assault.to_string()).or_default() += 1;
                }
                MetricEvent::LatencyInjected { millis } => report.latency_ms_total += millis,
            }
        }
        match &self.forward {
            Some(metrics) => metrics.publish(event),
            None => Ok(()),
        }
    }
}

/// Terminator that records kill requests instead of exiting.
#[derive(Debug, Default)]
struct DryRunTerminator {
    requests: AtomicU64,
}

impl Terminator for DryRunTerminator {
    fn terminate(&self, exit_code: i32) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        cm_warn!("dry run: kill-app assault suppressed (exit code {exit_code})");
    }
}

impl DrillCommand {
    pub fn execute(self) -> Result<()> {
        let loaded = load_config(self.config.as_deref())?;
        let mut settings = loaded.config.chaos_monkey;
        if self.force_enable {
            settings.enabled = true;
        }
        if let Some(cap) = self.latency_cap_ms {
            let latency = &mut settings.assaults.latency;
            latency.range_start_ms = latency.range_start_ms.min(cap);
            latency.range_end_ms = latency.range_end_ms.min(cap);
        }
        let handle = SettingsHandle::new(settings).with_context(|| {
            format!("invalid drill settings from {}", loaded.source.display())
        })?;

        let registry = new_registry();
        let forward = if self.metrics {
            Some(ChaosMetrics::new(registry.clone())?)
        } else {
            None
        };
        let recorder = Arc::new(DrillRecorder {
            report: Mutex::default(),
            forward,
        });
        let random: Arc<dyn RandomSource> = match self.seed {
            Some(seed) => Arc::new(SeededRandom::new(seed)),
            None => Arc::new(ThreadRandom),
        };
        let dry_run = Arc::new(DryRunTerminator::default());
        let terminator: Arc<dyn Terminator> = if self.allow_kill {
            Arc::new(ProcessTerminator)
        } else {
            dry_run.clone()
        };

        let monkey = ChaosMonkey::builder(handle)
            .random(random)
            .publisher(recorder.clone())
            .kill_switch(Arc::new(KillSwitch::new()))
            .terminator(terminator)
            .build();
        let watcher = BoundaryWatcher::new(self.boundary, monkey);

        let mut errors: IndexMap<String, u64> = IndexMap::new();
        for _ in 0..self.iterations {
            if let Err(err) = watcher.intercept(&self.declaring_type, &self.method, || ()) {
                *errors.entry(err.error_type().to_owned()).or_default() += 1;
            }
        }

        let mut report = recorder.report.lock().clone();
        report.iterations = self.iterations;
        report.failures = errors.values().sum();
        report.errors = errors;
        report.kill_requests = dry_run.requests.load(Ordering::SeqCst);

        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to render drill report")?
        );
        if self.metrics {
            print!("{}", render_text(&registry)?);
        }
        Ok(())
    }
}
