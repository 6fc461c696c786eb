#![warn(unused)]
#![warn(dead_code)]
//! SQL-dialect-agnostic query guard: classify, pattern-scan, and
//! allow/deny a query string before it reaches a database driver.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                         db-guard                          │
//! ├───────────────────────────────────────────────────────────┤
//! │  catalog  SqlPatternCatalog  (injection/destructive/schema/ │
//! │                               excessive/sensitive-column)   │
//! │  policy   DatabaseGuardPolicy + strict/moderate/permissive  │
//! │  guard    DatabaseGuard       (8-step validation algorithm) │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! `DatabaseGuard` never executes SQL and never reads the network: it
//! classifies a query string, scans it against the compiled catalog, and
//! returns a [`guard::QueryValidationResult`] for the caller to act on
//! (or, in `strict_mode`, a [`policy_core::Blocked::Query`] error).

pub mod catalog;
pub mod guard;
pub mod policy;
pub mod types;

pub use catalog::SqlPatternCatalog;
pub use guard::{classify, DatabaseGuard, GuardStats, QueryValidationResult};
pub use policy::{DatabaseGuardPolicy, POLICY_MODERATE, POLICY_PERMISSIVE, POLICY_STRICT};
pub use types::{PolicyViolation, QueryClassification, QueryType, SensitiveDataMatch, SensitiveDataType, ViolationType};
