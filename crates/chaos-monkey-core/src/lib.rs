//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Chaos Monkey fault injection engine."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
//! Chaos Monkey: probabilistic fault injection at a host's architectural boundaries.
//!
//! A host wires a [`ChaosMonkey`] over a [`SettingsHandle`], then places
//! [`BoundaryWatcher`]s (or calls [`ChaosMonkey::notify_boundary_entry`] directly)
//! wherever a controller, service, component or repository is entered.

pub mod assault;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod events;
pub mod metrics;
pub mod random;
pub mod settings;
pub mod signature;
pub mod watcher;

pub use assault::{
    Assault, CustomAssault, ExceptionAssault, KillAppAssault, KillSwitch, LatencyAssault,
    ProcessTerminator, Terminator,
};
pub use config::{AppConfig, LoadedAppConfig};
pub use control::{SettingsHandle, Status};
pub use engine::{ChaosMonkey, ChaosMonkeyBuilder};
pub use error::{AssaultError, ConfigError};
pub use events::{MetricEvent, MetricEventPublisher, NoopPublisher};
pub use metrics::{new_registry, render_text, ChaosMetrics, SharedRegistry};
pub use random::{RandomSource, SeededRandom, ThreadRandom};
pub use settings::{AssaultKind, BoundaryKind, Settings};
pub use signature::CallSignature;
pub use watcher::{should_watch, BoundaryWatcher, Watchers};

pub mod prelude {
    pub use crate::{
        AssaultError, AssaultKind, BoundaryKind, BoundaryWatcher, CallSignature, ChaosMonkey,
        Settings, SettingsHandle, Watchers,
    };
}
