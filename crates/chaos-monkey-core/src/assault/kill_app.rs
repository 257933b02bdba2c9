//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Assault strategies executed against eligible calls."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chaos_monkey_logging::{log_assault_event, AssaultOutcome, LogContext};
use once_cell::sync::Lazy;
use tracing::debug;

use super::Assault;
use crate::error::AssaultError;
use crate::settings::{AssaultKind, Settings};

static PROCESS_KILL_SWITCH: Lazy<Arc<KillSwitch>> = Lazy::new(|| Arc::new(KillSwitch::new()));

/// One-shot guard: at most one termination attempt per switch.
#[derive(Debug, Default)]
pub struct KillSwitch {
    tripped: AtomicBool,
}

impl KillSwitch {
    pub const fn new() -> Self {
        Self {
            tripped: AtomicBool::new(false),
        }
    }

    /// The switch shared by every kill-app assault of this process.
    pub fn process() -> Arc<KillSwitch> {
        Arc::clone(&PROCESS_KILL_SWITCH)
    }

    /// Trip the switch. Returns `true` only for the caller that tripped it.
    pub fn trip(&self) -> bool {
        self.tripped
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::SeqCst)
    }
}

/// Ends the process on behalf of the kill-app assault.
pub trait Terminator: Send + Sync + fmt::Debug {
    fn terminate(&self, exit_code: i32);
}

/// Exits the current process immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, exit_code: i32) {
        std::process::exit(exit_code);
    }
}

/// Terminates the application. Fires at most once per kill switch.
#[derive(Debug, Clone)]
pub struct KillAppAssault {
    switch: Arc<KillSwitch>,
    terminator: Arc<dyn Terminator>,
}

impl KillAppAssault {
    /// Assault bound to the process-wide kill switch and a real process exit.
    pub fn new() -> Self {
        Self::with_parts(KillSwitch::process(), Arc::new(ProcessTerminator))
    }

    pub fn with_parts(switch: Arc<KillSwitch>, terminator: Arc<dyn Terminator>) -> Self {
        Self { switch, terminator }
    }

    pub fn switch(&self) -> &Arc<KillSwitch> {
        &self.switch
    }
}

impl Default for KillAppAssault {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Assault for KillAppAssault {
    fn kind(&self) -> AssaultKind {
        AssaultKind::KillApp
    }

    fn attack(&self, settings: &Settings) -> Result<(), AssaultError> {
        if !self.switch.trip() {
            debug!(
                target: "chaos_monkey::assault::kill_app",
                "kill already in progress; ignoring"
            );
            return Ok(());
        }
        let exit_code = settings.assaults.kill_app.exit_code;
        log_assault_event(
            Some(&LogContext::new().with_assault("kill-app")),
            "assault.kill_app",
            &format!("Chaos Monkey - I am killing your application (exit code {exit_code})"),
            AssaultOutcome::Fatal,
        );
        self.terminator.terminate(exit_code);
        Ok(())
    }
}
