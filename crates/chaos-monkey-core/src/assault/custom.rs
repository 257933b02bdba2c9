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

use async_trait::async_trait;

use super::Assault;
use crate::error::AssaultError;
use crate::settings::{AssaultKind, CustomAssaultProperties, Settings};

type CustomAction = dyn Fn(&CustomAssaultProperties) -> Result<(), AssaultError> + Send + Sync;

/// Host-defined assault driven by `[assaults.custom.<name>]` parameters.
pub struct CustomAssault {
    name: String,
    action: Box<CustomAction>,
}

impl CustomAssault {
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&CustomAssaultProperties) -> Result<(), AssaultError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            action: Box::new(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomAssault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAssault")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Assault for CustomAssault {
    fn kind(&self) -> AssaultKind {
        AssaultKind::Custom(self.name.clone())
    }

    fn attack(&self, settings: &Settings) -> Result<(), AssaultError> {
        match settings.assaults.custom.get(&self.name) {
            Some(properties) => (self.action)(properties),
            None => Ok(()),
        }
    }
}
