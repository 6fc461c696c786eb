#![warn(unused)]
#![warn(dead_code)]
//! Two-layer THSP validation: a compiled regex catalog backing a fixed
//! Truth/Harm/Scope/Purpose gate order, fronted by an optional semantic
//! (LLM) second layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      pattern-gate                       │
//! ├─────────────────────────────────────────────────────────┤
//! │  catalog   PatternCatalog  (700+ compiled regex rules)   │
//! │  engine    GateEngine      (fixed T,H,S,P order)         │
//! │  semantic  SemanticClient  (optional LLM second layer)   │
//! │  pipeline  LayeredValidator (composes the two layers)    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! `treasury-guard` and `db-guard` both depend on this crate's
//! [`PatternCatalog`] machinery (compiled-pattern matching, category
//! lookup) rather than re-deriving their own regex engine, but own their
//! domain-specific pattern *content* themselves.

pub mod catalog;
pub mod engine;
pub mod pipeline;
pub mod semantic;
pub mod types;

pub use catalog::{Category, DetectionPattern, PatternCatalog};
pub use engine::{GateEngine, GateResult, ThspResult};
pub use pipeline::{default_validator, LayeredValidator, ValidationConfig, ValidationStats};
pub use semantic::{
    escape_xml_chars, generate_boundary_token, sanitize_for_validation, NullSemanticClient,
    SanitizeMetadata, SemanticClient, SemanticVerdict,
};
pub use types::{ContentKind, PlannedAction, ValidationContext};
