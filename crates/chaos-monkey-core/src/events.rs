//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Counter events emitted by watchers, the engine, and assaults."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::fmt;

use anyhow::Result;

use crate::settings::AssaultKind;
use crate::signature::CallSignature;

/// Counter event handed to the metrics collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEvent<'a> {
    /// A watched boundary was entered while the monkey was enabled.
    WatcherCall { signature: &'a CallSignature },
    /// A call passed the level draw and an assault is about to be picked.
    RequestEligible { signature: &'a CallSignature },
    /// An assault was selected for the call.
    Assault {
        signature: &'a CallSignature,
        assault: &'a AssaultKind,
    },
    /// Milliseconds of latency injected by the latency assault.
    LatencyInjected { millis: u64 },
}

/// Sink for [`MetricEvent`]s.
///
/// Publishing happens on the caller's hot path: implementations must not block.
/// Returned errors are logged and discarded by the engine.
pub trait MetricEventPublisher: Send + Sync + fmt::Debug {
    fn publish(&self, event: &MetricEvent<'_>) -> Result<()>;
}

/// Publisher that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

impl MetricEventPublisher for NoopPublisher {
    fn publish(&self, _event: &MetricEvent<'_>) -> Result<()> {
        Ok(())
    }
}
