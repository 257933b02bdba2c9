//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Watcher gate and per-boundary interceptors."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
//! Watchers sit at the host's architectural boundaries.
//!
//! The host decides where a boundary is; a [`BoundaryWatcher`] only records the
//! entry, asks the [`ChaosMonkey`] for a verdict and then runs (or skips) the real
//! call.

use std::future::Future;

use crate::engine::ChaosMonkey;
use crate::error::AssaultError;
use crate::settings::{BoundaryKind, Settings};
use crate::signature::CallSignature;

/// Whether calls at `signature` may be attacked under `settings`.
///
/// False when the boundary kind is not watched or the call site belongs to Chaos Monkey itself.
pub fn should_watch(settings: &Settings, signature: &CallSignature) -> bool {
    settings.watchers.is_watched(signature.boundary()) && !signature.is_internal()
}

/// Interceptor for one boundary kind.
#[derive(Debug, Clone)]
pub struct BoundaryWatcher {
    boundary: BoundaryKind,
    monkey: ChaosMonkey,
}

impl BoundaryWatcher {
    pub fn new(boundary: BoundaryKind, monkey: ChaosMonkey) -> Self {
        Self { boundary, monkey }
    }

    pub fn boundary(&self) -> BoundaryKind {
        self.boundary
    }

    pub fn signature(&self, declaring_type: &str, method: &str) -> CallSignature {
        CallSignature::new(self.boundary, declaring_type, method)
    }

    /// Run `proceed` unless an assault fails the call first.
    pub fn intercept<T, F>(
        &self,
        declaring_type: &str,
        method: &str,
        proceed: F,
    ) -> Result<T, AssaultError>
    where
        F: FnOnce() -> T,
    {
        let signature = self.signature(declaring_type, method);
        self.monkey.record_watcher_call(&signature);
        self.monkey.notify_boundary_entry(&signature)?;
        Ok(proceed())
    }

    /// Async flavour of [`BoundaryWatcher::intercept`].
    pub async fn intercept_async<T, Fut>(
        &self,
        declaring_type: &str,
        method: &str,
        proceed: Fut,
    ) -> Result<T, AssaultError>
    where
        Fut: Future<Output = T>,
    {
        let signature = self.signature(declaring_type, method);
        self.monkey.record_watcher_call(&signature);
        self.monkey.notify_boundary_entry_async(&signature).await?;
        Ok(proceed.await)
    }
}

/// One watcher per boundary kind, sharing a single engine.
#[derive(Debug, Clone)]
pub struct Watchers {
    pub controller: BoundaryWatcher,
    pub rest_controller: BoundaryWatcher,
    pub service: BoundaryWatcher,
    pub component: BoundaryWatcher,
    pub repository: BoundaryWatcher,
}

impl Watchers {
    pub fn new(monkey: &ChaosMonkey) -> Self {
        let watcher = |boundary| BoundaryWatcher::new(boundary, monkey.clone());
        Self {
            controller: watcher(BoundaryKind::Controller),
            rest_controller: watcher(BoundaryKind::RestController),
            service: watcher(BoundaryKind::Service),
            component: watcher(BoundaryKind::Component),
            repository: watcher(BoundaryKind::Repository),
        }
    }

    pub fn get(&self, boundary: BoundaryKind) -> &BoundaryWatcher {
        match boundary {
            BoundaryKind::Controller => &self.controller,
            BoundaryKind::RestController => &self.rest_controller,
            BoundaryKind::Service => &self.service,
            BoundaryKind::Component => &self.component,
            BoundaryKind::Repository => &self.repository,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::SettingsHandle;
    use crate::settings::AssaultKind;

    fn always_exception() -> Settings {
        let mut settings = Settings {
            enabled: true,
            level: 1,
            ..Settings::default()
        };
        settings.chosen_assaults = [AssaultKind::Exception].into_iter().collect();
        settings.assaults.exception.active = true;
        settings
    }

    #[test]
    fn gate_follows_watcher_flags() {
        let mut settings = Settings::default();
        let service = CallSignature::new(BoundaryKind::Service, "shop::Orders", "list");
        let controller = CallSignature::new(BoundaryKind::Controller, "shop::Web", "index");
        assert!(should_watch(&settings, &service));
        assert!(!should_watch(&settings, &controller));

        settings.watchers.set(BoundaryKind::Service, false);
        settings.watchers.set(BoundaryKind::Controller, true);
        assert!(!should_watch(&settings, &service));
        assert!(should_watch(&settings, &controller));
    }

    #[test]
    fn gate_excludes_own_namespace() {
        let settings = Settings::default();
        let own = CallSignature::new(
            BoundaryKind::Service,
            "chaos_monkey_core::control::SettingsHandle",
            "load",
        );
        assert!(!should_watch(&settings, &own));
    }

    #[test]
    fn intercept_skips_the_real_call_on_assault() {
        let monkey = ChaosMonkey::new(SettingsHandle::new(always_exception()).unwrap());
        let watchers = Watchers::new(&monkey);
        let mut ran = false;
        let result = watchers
            .get(BoundaryKind::Service)
            .intercept("shop::Orders", "list", || ran = true);
        assert!(result.is_err());
        assert!(!ran);
    }

    #[test]
    fn unwatched_boundary_runs_the_real_call() {
        let monkey = ChaosMonkey::new(SettingsHandle::new(always_exception()).unwrap());
        let watchers = Watchers::new(&monkey);
        let value = watchers
            .component
            .intercept("shop::Cache", "get", || 42)
            .unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn async_intercept_returns_the_call_output() {
        let handle = SettingsHandle::default();
        let monkey = ChaosMonkey::new(handle);
        let watcher = BoundaryWatcher::new(BoundaryKind::Repository, monkey);
        let rows = watcher
            .intercept_async("shop::OrderRepository", "find_all", async { vec![1, 2, 3] })
            .await
            .unwrap();
        assert_eq!(rows, vec![1, 2, 3]);
    }
}
