//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Prometheus counters backing the default metric publisher."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

use crate::events::{MetricEvent, MetricEventPublisher};

/// Shared registry type used across the workspace.
pub type SharedRegistry = Arc<Registry>;

/// Produce a new shared registry.
pub fn new_registry() -> SharedRegistry {
    Arc::new(Registry::new())
}

/// Encode every metric family of `registry` in the Prometheus text format.
pub fn render_text(registry: &Registry) -> Result<String> {
    let families = registry.gather();
    TextEncoder::new()
        .encode_to_string(&families)
        .context("failed to encode metrics")
}

/// Counters published by the chaos monkey.
#[derive(Clone)]
pub struct ChaosMetrics {
    registry: SharedRegistry,
    watcher_calls_total: IntCounterVec,
    requests_total: IntCounterVec,
    assaults_total: IntCounterVec,
    latency_injected_ms_total: IntCounter,
}

impl ChaosMetrics {
    /// Register the chaos monkey metric family against the provided registry.
    pub fn new(registry: SharedRegistry) -> Result<Self> {
        let watcher_calls_total = IntCounterVec::new(
            Opts::new(
                "chaos_monkey_watcher_calls_total",
                "Watched boundary entries observed by the chaos monkey watchers",
            ),
            &["boundary", "signature"],
        )?;
        registry.register(Box::new(watcher_calls_total.clone()))?;

        let requests_total = IntCounterVec::new(
            Opts::new(
                "chaos_monkey_requests_total",
                "Calls that passed the level draw, split into eligible and assaulted",
            ),
            &["type"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let assaults_total = IntCounterVec::new(
            Opts::new(
                "chaos_monkey_assaults_total",
                "Assaults launched per boundary, call site and assault kind",
            ),
            &["boundary", "signature", "assault"],
        )?;
        registry.register(Box::new(assaults_total.clone()))?;

        let latency_injected_ms_total = IntCounter::with_opts(Opts::new(
            "chaos_monkey_latency_injected_milliseconds_total",
            "Total latency injected by the latency assault",
        ))?;
        registry.register(Box::new(latency_injected_ms_total.clone()))?;

        Ok(Self {
            registry,
            watcher_calls_total,
            requests_total,
            assaults_total,
            latency_injected_ms_total,
        })
    }

    /// Expose the underlying shared registry for convenience.
    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }
}

impl MetricEventPublisher for ChaosMetrics {
    fn publish(&self, event: &MetricEvent<'_>) -> Result<()> {
        match event {
            MetricEvent::WatcherCall { signature } => {
                let name = signature.qualified_name();
                let labels = [signature.boundary().as_str(), name.as_str()];
                self.watcher_calls_total
                    .get_metric_with_label_values(&labels)?
                    .inc();
            }
            MetricEvent::RequestEligible { .. } => {
                self.requests_total
                    .get_metric_with_label_values(&["eligible"])?
                    .inc();
            }
            MetricEvent::Assault { signature, assault } => {
                let name = signature.qualified_name();
                let kind = assault.to_string();
                let labels = [signature.boundary().as_str(), name.as_str(), kind.as_str()];
                self.assaults_total
                    .get_metric_with_label_values(&labels)?
                    .inc();
                self.requests_total
                    .get_metric_with_label_values(&["assaulted"])?
                    .inc();
            }
            MetricEvent::LatencyInjected { millis } => {
                self.latency_injected_ms_total.inc_by(*millis);
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChaosMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChaosMetrics").finish_non_exhaustive()
    }
}
