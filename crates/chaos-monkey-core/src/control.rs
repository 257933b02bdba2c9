//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Runtime control surface for reading and swapping settings."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
//! Runtime control surface.
//!
//! Readers take lock-free snapshots through [`ArcSwap`]; writers validate a complete
//! replacement and swap it in one step, so a request never observes half an update.
//! Writers serialise on a mutex that readers never touch.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::settings::{BoundaryKind, Settings};

/// Coarse state reported to management collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ready,
    Disabled,
}

impl Status {
    /// Status reported for a settings snapshot.
    pub fn of(settings: &Settings) -> Self {
        if settings.enabled {
            Status::Ready
        } else {
            Status::Disabled
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ready => "Ready to be evil!",
            Status::Disabled => "You switched me off!",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct Shared {
    current: ArcSwap<Settings>,
    writer: Mutex<()>,
    version: watch::Sender<u64>,
}

/// Cloneable handle to the active [`Settings`].
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    shared: Arc<Shared>,
}

impl SettingsHandle {
    /// Publish `settings` as the initial configuration after validating them.
    pub fn new(settings: Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        Ok(Self::from_validated(settings))
    }

    fn from_validated(settings: Settings) -> Self {
        let (version, _) = watch::channel(0);
        Self {
            shared: Arc::new(Shared {
                current: ArcSwap::from_pointee(settings),
                writer: Mutex::new(()),
                version,
            }),
        }
    }

    /// Snapshot of the active settings.
    pub fn load(&self) -> Arc<Settings> {
        self.shared.current.load_full()
    }

    /// Validate and atomically install `settings`. On error the previous settings stay active.
    pub fn replace(&self, settings: Settings) -> Result<(), ConfigError> {
        if let Err(err) = settings.validate() {
            warn!(
                target: "chaos_monkey::control",
                error = %err,
                "rejected settings replacement"
            );
            return Err(err);
        }
        let _guard = self.shared.writer.lock();
        self.publish(Arc::new(settings));
        Ok(())
    }

    /// Copy the active settings, apply `change`, validate and install the result.
    pub fn update<F>(&self, change: F) -> Result<Arc<Settings>, ConfigError>
    where
        F: FnOnce(&mut Settings),
    {
        let _guard = self.shared.writer.lock();
        let mut next = Settings::clone(&self.shared.current.load());
        change(&mut next);
        if let Err(err) = next.validate() {
            warn!(
                target: "chaos_monkey::control",
                error = %err,
                "rejected settings update"
            );
            return Err(err);
        }
        let next = Arc::new(next);
        self.publish(Arc::clone(&next));
        Ok(next)
    }

    /// Re-read settings from disk and install them.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let settings = Settings::from_file(path.as_ref())?;
        self.replace(settings)?;
        info!(
            target: "chaos_monkey::control",
            path = %path.as_ref().display(),
            "settings reloaded"
        );
        Ok(())
    }

    pub fn enable(&self) -> Result<Arc<Settings>, ConfigError> {
        self.update(|settings| settings.enabled = true)
    }

    pub fn disable(&self) -> Result<Arc<Settings>, ConfigError> {
        self.update(|settings| settings.enabled = false)
    }

    pub fn set_watcher(
        &self,
        boundary: BoundaryKind,
        watched: bool,
    ) -> Result<Arc<Settings>, ConfigError> {
        self.update(|settings| settings.watchers.set(boundary, watched))
    }

    pub fn status(&self) -> Status {
        Status::of(&self.shared.current.load())
    }

    /// Number of successful swaps since creation.
    pub fn version(&self) -> u64 {
        *self.shared.version.borrow()
    }

    /// Receiver that observes the version counter after every successful swap.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.shared.version.subscribe()
    }

    fn publish(&self, settings: Arc<Settings>) {
        let enabled = settings.enabled;
        let level = settings.level;
        self.shared.current.store(settings);
        self.shared.version.send_modify(|version| *version += 1);
        info!(
            target: "chaos_monkey::control",
            enabled,
            level,
            version = self.version(),
            "settings installed"
        );
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::from_validated(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::settings::AssaultKind;

    #[test]
    fn rejected_replacement_keeps_previous_settings() {
        let handle = SettingsHandle::default();
        let before = handle.load();

        let invalid = Settings {
            level: 0,
            ..Settings::default()
        };
        let err = handle.replace(invalid).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLevel { level: 0, .. }));
        assert_eq!(*handle.load(), *before);
        assert_eq!(handle.version(), 0);
    }

    #[test]
    fn replace_installs_new_snapshot() {
        let handle = SettingsHandle::default();
        let old = handle.load();
        let next = Settings {
            enabled: true,
            level: 1,
            ..Settings::default()
        };
        handle.replace(next.clone()).unwrap();

        assert_eq!(*handle.load(), next);
        // Snapshots taken before the swap are unaffected.
        assert!(!old.enabled);
        assert_eq!(handle.version(), 1);
        assert_eq!(handle.status(), Status::Ready);
    }

    #[test]
    fn update_validates_before_swapping() {
        let handle = SettingsHandle::default();
        let err = handle
            .update(|settings| {
                settings.enabled = true;
                settings.chosen_assaults.clear();
            })
            .unwrap_err();
        assert!(matches!(err, ConfigError::NoAssaultChosen));
        assert!(!handle.load().enabled);

        handle.enable().unwrap();
        handle
            .set_watcher(BoundaryKind::Controller, true)
            .unwrap();
        let settings = handle.load();
        assert!(settings.enabled);
        assert!(settings.watchers.controller);
        handle.disable().unwrap();
        assert_eq!(handle.status(), Status::Disabled);
    }

    #[test]
    fn status_follows_the_enabled_flag() {
        let mut settings = Settings::default();
        assert_eq!(Status::of(&settings), Status::Disabled);
        assert_eq!(Status::of(&settings).to_string(), "You switched me off!");
        settings.enabled = true;
        assert_eq!(Status::of(&settings), Status::Ready);
        assert_eq!(Status::of(&settings).as_str(), "Ready to be evil!");
    }

    #[test]
    fn new_rejects_invalid_settings() {
        let mut settings = Settings::default();
        settings.assaults.latency.range_start_ms = 10;
        settings.assaults.latency.range_end_ms = 5;
        assert!(SettingsHandle::new(settings).is_err());
    }

    #[test]
    fn reload_reads_settings_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "enabled = true\nlevel = 2\nchosen_assaults = [\"exception\"]\n[assaults.exception]\nactive = true"
        )
        .unwrap();

        let handle = SettingsHandle::default();
        handle.reload_from(file.path()).unwrap();
        let settings = handle.load();
        assert_eq!(settings.level, 2);
        assert!(settings.is_assault_active(&AssaultKind::Exception));

        let missing = handle.reload_from("/nonexistent/chaos.toml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
        assert_eq!(handle.load().level, 2);
    }

    #[tokio::test]
    async fn subscribers_observe_swaps() {
        let handle = SettingsHandle::default();
        let mut receiver = handle.subscribe();
        handle.enable().unwrap();
        receiver.changed().await.unwrap();
        assert_eq!(*receiver.borrow(), 1);
    }

    #[test]
    fn concurrent_readers_never_see_torn_settings() {
        let handle = SettingsHandle::default();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let reader = handle.clone();
                scope.spawn(move || {
                    for _ in 0..2_000 {
                        let snapshot = reader.load();
                        // Writers always flip `enabled` and `level` together.
                        assert_eq!(snapshot.enabled, snapshot.level == 1);
                    }
                });
            }
            for round in 0..500 {
                let enabled = round % 2 == 0;
                handle
                    .replace(Settings {
                        enabled,
                        level: if enabled { 1 } else { 5 },
                        ..Settings::default()
                    })
                    .unwrap();
            }
        });
    }
}
