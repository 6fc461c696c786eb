#![warn(unused)]
#![warn(dead_code)]
//! Shared foundation for the sentinel-gate policy workspace.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                       policy-core                        │
//! ├───────────────────────────────────────────────────────────┤
//! │  Verdict / RiskLevel / Gate   (unified validation result) │
//! │  ConfigError / ProviderError / PatternCompileError / …    │
//! │  Clock                        (monotonic, window-safe)   │
//! │  AuditLog                     (bounded, PII-safe)         │
//! └───────────────────────────────────────────────────────────┘
//!           ▲                 ▲                  ▲
//!   pattern-gate      treasury-guard         db-guard
//! ```
//!
//! Every other crate in this workspace depends on this one for its
//! result type, error taxonomy, clock, and audit plumbing so that the
//! four subsystems (gate engine, payment policy, database guard) compose
//! without re-deriving the same scaffolding four times.

pub mod audit;
pub mod clock;
pub mod error;
pub mod money;
pub mod verdict;

pub use audit::{AuditEntry, AuditLog};
pub use clock::{Clock, SystemClock, Window};
pub use error::{Blocked, ConfigError, PatternCompileError, ProviderError};
pub use money::Decimal;
pub use verdict::{Gate, RiskLevel, ValidationLayer, ValidationMode, Verdict};
