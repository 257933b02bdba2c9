//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Assault strategies executed against eligible calls."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use async_trait::async_trait;

use super::Assault;
use crate::error::AssaultError;
use crate::settings::{AssaultKind, Settings};

/// Fails the call with the configured error instead of running it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExceptionAssault;

#[async_trait]
impl Assault for ExceptionAssault {
    fn kind(&self) -> AssaultKind {
        AssaultKind::Exception
    }

    fn attack(&self, settings: &Settings) -> Result<(), AssaultError> {
        let exception = &settings.assaults.exception;
        Err(AssaultError::Injected {
            error_type: exception.error_type.clone(),
            message: exception.message.clone(),
        })
    }
}
