//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Assault strategies executed against eligible calls."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::Assault;
use crate::error::AssaultError;
use crate::events::{MetricEvent, MetricEventPublisher};
use crate::random::RandomSource;
use crate::settings::{AssaultKind, Settings};

/// Suspends the call for a delay drawn from the configured range.
#[derive(Debug, Clone)]
pub struct LatencyAssault {
    random: Arc<dyn RandomSource>,
    publisher: Arc<dyn MetricEventPublisher>,
}

impl LatencyAssault {
    pub fn new(random: Arc<dyn RandomSource>, publisher: Arc<dyn MetricEventPublisher>) -> Self {
        Self { random, publisher }
    }

    /// Pick the delay for this call. `None` when the random source fails.
    pub fn delay(&self, settings: &Settings) -> Option<Duration> {
        let latency = &settings.assaults.latency;
        match self
            .random
            .draw(latency.range_start_ms, latency.range_end_ms)
        {
            Ok(millis) => {
                if let Err(err) = self.publisher.publish(&MetricEvent::LatencyInjected { millis }) {
                    warn!(
                        target: "chaos_monkey::assault::latency",
                        error = %err,
                        "failed to publish latency metric"
                    );
                }
                debug!(
                    target: "chaos_monkey::assault::latency",
                    delay_ms = millis,
                    "injecting latency"
                );
                Some(Duration::from_millis(millis))
            }
            Err(err) => {
                warn!(
                    target: "chaos_monkey::assault::latency",
                    error = %err,
                    "latency draw failed; skipping delay"
                );
                None
            }
        }
    }
}

#[async_trait]
impl Assault for LatencyAssault {
    fn kind(&self) -> AssaultKind {
        AssaultKind::Latency
    }

    fn attack(&self, settings: &Settings) -> Result<(), AssaultError> {
        if let Some(delay) = self.delay(settings) {
            std::thread::sleep(delay);
        }
        Ok(())
    }

    async fn attack_async(&self, settings: &Settings) -> Result<(), AssaultError> {
        if let Some(delay) = self.delay(settings) {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}
