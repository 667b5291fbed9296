//! Logging macros that tag every event with a `domain` field.
//!
//! Domains: `sys` (executor lifecycle), `pipe` (record flow and
//! evaluation), `res` (sources and sinks), `conf` (configuration).
//!
//! ```ignore
//! crunch_info!(sys, pipeline = %id, "executor started");
//! crunch_warn!(pipe, stream = %name, error = %e, "evaluation failed");
//! ```
//!
//! The domain is a bare identifier, turned into a string by the macro.

#[doc(hidden)]
macro_rules! crunch_log {
    ($level:ident, $domain:ident, $($field:tt)*) => {
        tracing::$level!(domain = stringify!($domain), $($field)*)
    };
}

macro_rules! crunch_error {
    ($domain:ident, $($rest:tt)*) => {
        crunch_log!(error, $domain, $($rest)*)
    };
}

macro_rules! crunch_warn {
    ($domain:ident, $($rest:tt)*) => {
        crunch_log!(warn, $domain, $($rest)*)
    };
}

macro_rules! crunch_info {
    ($domain:ident, $($rest:tt)*) => {
        crunch_log!(info, $domain, $($rest)*)
    };
}

macro_rules! crunch_debug {
    ($domain:ident, $($rest:tt)*) => {
        crunch_log!(debug, $domain, $($rest)*)
    };
}

macro_rules! crunch_trace {
    ($domain:ident, $($rest:tt)*) => {
        crunch_log!(trace, $domain, $($rest)*)
    };
}
