//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Assault strategies executed against eligible calls."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
//! Assault strategies.
//!
//! Every strategy answers two questions: is it currently switched on for a given
//! [`Settings`] snapshot, and what happens to the call when it fires. Strategies
//! receive the snapshot the engine decided with, so one invocation never mixes two
//! configurations.

use std::fmt;

use async_trait::async_trait;

use crate::error::AssaultError;
use crate::settings::{AssaultKind, Settings};

mod custom;
mod exception;
mod kill_app;
mod latency;

pub use custom::CustomAssault;
pub use exception::ExceptionAssault;
pub use kill_app::{KillAppAssault, KillSwitch, ProcessTerminator, Terminator};
pub use latency::LatencyAssault;

/// A failure mode the engine can launch against a call.
#[async_trait]
pub trait Assault: Send + Sync + fmt::Debug {
    fn kind(&self) -> AssaultKind;

    /// Chosen in `settings` and switched on by its own `active` flag.
    fn is_active(&self, settings: &Settings) -> bool {
        settings.is_assault_active(&self.kind())
    }

    /// Run the assault on the calling thread.
    fn attack(&self, settings: &Settings) -> Result<(), AssaultError>;

    /// Run the assault from async code. Defaults to [`Assault::attack`].
    async fn attack_async(&self, settings: &Settings) -> Result<(), AssaultError> {
        self.attack(settings)
    }
}
