//! Fatal, construction-time error taxonomy shared by every crate in the
//! workspace. Runtime allow/deny/timeout outcomes are never `Err` values
//! (see `Verdict`); only configuration and catalog failures, and the
//! "strict" wrapper APIs, produce an `Err` here.

use thiserror::Error;

/// Errors raised while constructing a validator, guard, or tracker from
/// configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("config value out of range: `{field}` must be {constraint}, got {value}")]
    OutOfRange {
        field: &'static str,
        constraint: &'static str,
        value: String,
    },

    #[error("failed to parse config: {0}")]
    ParseError(String),
}

/// Errors raised while compiling a [`crate::verdict`]-adjacent pattern
/// catalog at startup. Always fatal; callers should abort rather than
/// run with a partially loaded catalog.
#[derive(Debug, Error)]
pub enum PatternCompileError {
    #[error("duplicate pattern id `{0}` in catalog")]
    DuplicateId(String),

    #[error("pattern `{id}` failed to compile: {source}")]
    Regex {
        id: String,
        #[source]
        source: regex::Error,
    },
}

/// Errors surfaced by the semantic layer's provider call. The pipeline
/// treats both variants as subject to the fail-open/fail-closed policy,
/// never as a panic.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("semantic provider call timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("semantic provider call failed: {0}")]
    Failed(String),

    #[error("semantic provider unavailable")]
    Unavailable,
}

/// Raised only by "strict" adapter APIs that convert a blocked
/// [`crate::verdict::Verdict`] into an exception-style return, for
/// callers that prefer that style over inspecting the verdict.
#[derive(Debug, Error)]
pub enum Blocked {
    #[error("query blocked: {reason}")]
    Query { reason: String },

    #[error("payment blocked: {reason}")]
    Payment { reason: String },

    #[error("payment rejected: {reason}")]
    PaymentRejected { reason: String },

    #[error("confirmation required before proceeding: {reason}")]
    ConfirmationRequired { reason: String },
}
