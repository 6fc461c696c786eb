//! Shared value types for query classification and violation reporting.
//!
//! Grounded on `original_source/.../database/types.py`'s `QueryType`,
//! `ViolationType`, `SensitiveDataType`, `PolicyViolation`, and
//! `SensitiveDataMatch` dataclasses/enums.

use std::collections::HashSet;

use policy_core::RiskLevel;

/// Classification of a SQL statement by its leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Alter,
    Truncate,
    Execute,
    Unknown,
}

impl QueryType {
    /// `true` for the query types considered destructive on their own
    /// (DELETE, DROP, TRUNCATE), independent of whether a specific
    /// destructive pattern also matched.
    pub fn is_destructive(self) -> bool {
        matches!(self, QueryType::Delete | QueryType::Drop | QueryType::Truncate)
    }
}

/// What kind of policy rule a [`crate::catalog::DetectionPattern`] or ad
/// hoc check enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    SqlInjection,
    ExcessiveData,
    SensitiveData,
    DestructiveOperation,
    MissingWhere,
    UnauthorizedTable,
    ProhibitedPattern,
    SchemaModification,
    PrivilegeEscalation,
}

/// Classification of a sensitive-column match, mirroring the catalog's
/// `Category` split for gate-facing patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitiveDataType {
    Pii,
    Financial,
    Authentication,
    Health,
    Legal,
}

/// One policy violation surfaced by [`crate::guard::DatabaseGuard::validate`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PolicyViolation {
    pub violation_type: ViolationType,
    pub risk_level: RiskLevel,
    pub description: String,
    pub pattern_matched: Option<String>,
    pub remediation: Option<String>,
}

impl PolicyViolation {
    pub fn new(violation_type: ViolationType, risk_level: RiskLevel, description: impl Into<String>) -> Self {
        PolicyViolation {
            violation_type,
            risk_level,
            description: description.into(),
            pattern_matched: None,
            remediation: None,
        }
    }

    pub fn with_pattern_matched(mut self, matched: impl Into<String>) -> Self {
        self.pattern_matched = Some(matched.into());
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }
}

/// One sensitive-column detection, carrying the data category and the
/// identifier token that matched.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SensitiveDataMatch {
    pub data_type: SensitiveDataType,
    pub pattern_id: String,
    pub column_name: Option<String>,
    pub description: String,
}

/// `{type, tables}` — the query-shape facts extracted before any policy
/// check runs, independent of whether the query is ultimately allowed.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueryClassification {
    pub query_type: QueryType,
    pub tables: HashSet<String>,
}
