//! ---
//! cm_section: "03-logging"
//! cm_subsection: "module"
//! cm_type: "source"
//! cm_scope: "code"
//! cm_description: "Structured logging adapters and sinks."
//! cm_version: "v0.0.0-prealpha"
//! cm_owner: "tbd"
//! ---
//! Logging macros that stamp every event with the boundary/signature/assault context.

/// Shared expansion behind the level-specific macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __cm_event {
    ($level:ident, context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::$level,
            boundary = ctx.boundary.unwrap_or(""),
            signature = ctx.signature.unwrap_or(""),
            assault = ctx.assault.unwrap_or(""),
            message = %format_args!($($arg)+)
        );
    }};
    ($level:ident, $($arg:tt)+) => {{
        $crate::__cm_event!($level, context = $crate::LogContext::default(), $($arg)+)
    }};
}

/// Emit an informational log enriched with assault context.
#[macro_export]
macro_rules! cm_info {
    ($($arg:tt)+) => {
        $crate::__cm_event!(INFO, $($arg)+)
    };
}

/// Emit a warning enriched with assault context.
#[macro_export]
macro_rules! cm_warn {
    ($($arg:tt)+) => {
        $crate::__cm_event!(WARN, $($arg)+)
    };
}

/// Emit an error log enriched with assault context.
#[macro_export]
macro_rules! cm_error {
    ($($arg:tt)+) => {
        $crate::__cm_event!(ERROR, $($arg)+)
    };
}
