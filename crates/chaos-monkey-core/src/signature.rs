//! ---
//! cm_section: "07-fault-injection"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Identity of an intercepted call."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
use std::fmt;

use crate::settings::BoundaryKind;

/// Crate paths of the Chaos Monkey workspace. Calls declared in them are never attacked.
pub const INTERNAL_NAMESPACES: &[&str] = &[
    "chaos_monkey_core",
    "chaos_monkey_logging",
    "chaos_monkeyctl",
];

/// Identity of the call the host is about to execute.
///
/// Built per invocation; used for the self-exclusion check and as the metric key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSignature {
    boundary: BoundaryKind,
    declaring_type: String,
    method: String,
}

impl CallSignature {
    pub fn new(
        boundary: BoundaryKind,
        declaring_type: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            boundary,
            declaring_type: declaring_type.into(),
            method: method.into(),
        }
    }

    /// Signature whose declaring type is the Rust path of `T`.
    pub fn of<T: ?Sized>(boundary: BoundaryKind, method: impl Into<String>) -> Self {
        Self::new(boundary, std::any::type_name::<T>(), method)
    }

    pub fn boundary(&self) -> BoundaryKind {
        self.boundary
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// `Type.method`, the key used by metrics and `watched_custom_services`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.declaring_type, self.method)
    }

    /// Whether the declaring type lives inside a Chaos Monkey crate.
    pub fn is_internal(&self) -> bool {
        INTERNAL_NAMESPACES.iter().any(|namespace| {
            self.declaring_type
                .strip_prefix(namespace)
                .map(|rest| rest.is_empty() || rest.starts_with("::"))
                .unwrap_or(false)
        })
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.declaring_type, self.method)
    }
}
