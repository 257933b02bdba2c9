//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Decision engine choosing and launching assaults."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::sync::Arc;

use chaos_monkey_logging::{cm_warn, log_assault_event, AssaultOutcome, LogContext};
use indexmap::IndexMap;
use tracing::{debug, info, trace};

use crate::assault::{
    Assault, ExceptionAssault, KillAppAssault, KillSwitch, LatencyAssault, ProcessTerminator,
    Terminator,
};
use crate::control::{SettingsHandle, Status};
use crate::error::AssaultError;
use crate::events::{MetricEvent, MetricEventPublisher, NoopPublisher};
use crate::random::{RandomSource, ThreadRandom};
use crate::settings::{AssaultKind, Settings};
use crate::signature::CallSignature;
use crate::watcher::should_watch;

/// Decision engine invoked by host interceptors right before the real call runs.
///
/// Cheap to clone; clones share settings, assaults, random source and publisher.
#[derive(Debug, Clone)]
pub struct ChaosMonkey {
    settings: SettingsHandle,
    assaults: Arc<IndexMap<AssaultKind, Arc<dyn Assault>>>,
    random: Arc<dyn RandomSource>,
    publisher: Arc<dyn MetricEventPublisher>,
}

impl ChaosMonkey {
    /// Engine with the built-in assaults, a thread-local random source and no metrics.
    pub fn new(settings: SettingsHandle) -> Self {
        Self::builder(settings).build()
    }

    pub fn builder(settings: SettingsHandle) -> ChaosMonkeyBuilder {
        ChaosMonkeyBuilder::new(settings)
    }

    pub fn settings(&self) -> &SettingsHandle {
        &self.settings
    }

    pub fn status(&self) -> Status {
        self.settings.status()
    }

    /// Blocking boundary notification.
    ///
    /// Returns `Ok(())` when the host may run the real call. Latency blocks the calling
    /// thread, an exception assault returns its error unchanged, kill-app ends the process.
    pub fn notify_boundary_entry(&self, signature: &CallSignature) -> Result<(), AssaultError> {
        match self.select(signature) {
            Some((settings, assault)) => assault.attack(&settings),
            None => Ok(()),
        }
    }

    /// Async boundary notification. Latency suspends only the calling task.
    pub async fn notify_boundary_entry_async(
        &self,
        signature: &CallSignature,
    ) -> Result<(), AssaultError> {
        match self.select(signature) {
            Some((settings, assault)) => assault.attack_async(&settings).await,
            None => Ok(()),
        }
    }

    /// Record a watched boundary entry, whether or not the monkey is enabled.
    pub fn record_watcher_call(&self, signature: &CallSignature) {
        let settings = self.settings.load();
        if should_watch(&settings, signature) {
            self.emit(&MetricEvent::WatcherCall { signature });
        }
    }

    fn select(&self, signature: &CallSignature) -> Option<(Arc<Settings>, Arc<dyn Assault>)> {
        let settings = self.settings.load();
        if !settings.enabled
            || !should_watch(&settings, signature)
            || !settings.is_watched_service(signature)
        {
            return None;
        }
        if !self.is_trouble(&settings, signature) {
            return None;
        }

        // At most one candidate per chosen kind.
        let active: Vec<&Arc<dyn Assault>> = settings
            .chosen_assaults
            .iter()
            .filter_map(|kind| self.assaults.get(kind))
            .filter(|assault| assault.is_active(&settings))
            .collect();
        if active.is_empty() {
            trace!(
                target: "chaos_monkey::engine",
                signature = %signature,
                "eligible call without active assaults"
            );
            return None;
        }
        self.emit(&MetricEvent::RequestEligible { signature });

        let upper = (active.len() - 1) as u64;
        let index = match self.random.draw(0, upper) {
            Ok(index) => index as usize,
            Err(err) => {
                self.skip(signature, &format!("assault selection failed: {err}"));
                return None;
            }
        };
        let assault = Arc::clone(active.get(index)?);
        let kind = assault.kind();
        self.emit(&MetricEvent::Assault {
            signature,
            assault: &kind,
        });

        let boundary = signature.boundary().as_str();
        let name = signature.qualified_name();
        let label = kind.to_string();
        log_assault_event(
            Some(
                &LogContext::new()
                    .with_boundary(boundary)
                    .with_signature(&name)
                    .with_assault(&label),
            ),
            "assault.launched",
            "Chaos Monkey assault launched",
            AssaultOutcome::Launched,
        );
        Some((settings, assault))
    }

    /// Level gate: one draw in `[1, level]`, eligible when it hits `level`.
    fn is_trouble(&self, settings: &Settings, signature: &CallSignature) -> bool {
        let level = u64::from(settings.level);
        match self.random.draw(1, level) {
            Ok(draw) => draw == level,
            Err(err) => {
                self.skip(signature, &format!("level draw failed: {err}"));
                false
            }
        }
    }

    fn emit(&self, event: &MetricEvent<'_>) {
        if let Err(err) = self.publisher.publish(event) {
            cm_warn!("failed to publish chaos monkey metric: {err}");
        }
    }

    fn skip(&self, signature: &CallSignature, reason: &str) {
        let name = signature.qualified_name();
        log_assault_event(
            Some(
                &LogContext::new()
                    .with_boundary(signature.boundary().as_str())
                    .with_signature(&name),
            ),
            "assault.skipped",
            reason,
            AssaultOutcome::Skipped,
        );
    }
}

/// Builder wiring the engine collaborators.
#[derive(Debug)]
pub struct ChaosMonkeyBuilder {
    settings: SettingsHandle,
    random: Arc<dyn RandomSource>,
    publisher: Arc<dyn MetricEventPublisher>,
    kill_switch: Arc<KillSwitch>,
    terminator: Arc<dyn Terminator>,
    custom: Vec<Arc<dyn Assault>>,
}

impl ChaosMonkeyBuilder {
    fn new(settings: SettingsHandle) -> Self {
        Self {
            settings,
            random: Arc::new(ThreadRandom),
            publisher: Arc::new(NoopPublisher),
            kill_switch: KillSwitch::process(),
            terminator: Arc::new(ProcessTerminator),
            custom: Vec::new(),
        }
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn MetricEventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn kill_switch(mut self, kill_switch: Arc<KillSwitch>) -> Self {
        self.kill_switch = kill_switch;
        self
    }

    pub fn terminator(mut self, terminator: Arc<dyn Terminator>) -> Self {
        self.terminator = terminator;
        self
    }

    /// Register an additional assault, typically a [`CustomAssault`](crate::CustomAssault).
    ///
    /// A later registration replaces any earlier assault reporting the same kind,
    /// built-ins included.
    pub fn assault(mut self, assault: Arc<dyn Assault>) -> Self {
        self.custom.push(assault);
        self
    }

    pub fn build(self) -> ChaosMonkey {
        let builtin: [Arc<dyn Assault>; 3] = [
            Arc::new(LatencyAssault::new(
                Arc::clone(&self.random),
                Arc::clone(&self.publisher),
            )),
            Arc::new(ExceptionAssault),
            Arc::new(KillAppAssault::with_parts(self.kill_switch, self.terminator)),
        ];
        let mut assaults: IndexMap<AssaultKind, Arc<dyn Assault>> = IndexMap::new();
        for assault in builtin.into_iter().chain(self.custom) {
            let kind = assault.kind();
            if assaults.insert(kind.clone(), assault).is_some() {
                debug!(
                    target: "chaos_monkey::engine",
                    assault = %kind,
                    "assault registration replaced an earlier one"
                );
            }
        }

        let settings = self.settings.load();
        info!(
            target: "chaos_monkey::engine",
            enabled = settings.enabled,
            level = settings.level,
            assaults = assaults.len(),
            "Chaos Monkey - ready to do evil"
        );

        ChaosMonkey {
            settings: self.settings,
            assaults: Arc::new(assaults),
            random: self.random,
            publisher: self.publisher,
        }
    }
}
