//! Configuration for [`crate::guard::DatabaseGuard`]: row limits, blocked
//! operation classes, table allow/blocklists, and sensitive-data
//! handling, plus the strict/moderate/permissive presets.
//!
//! Field-for-field port of `original_source/.../database/types.py`'s
//! `DatabaseGuardPolicy` and its `POLICY_STRICT`/`POLICY_MODERATE`/
//! `POLICY_PERMISSIVE` constants.

use std::collections::HashSet;

/// Policy knobs for [`crate::guard::DatabaseGuard`]. Immutable once
/// constructed; use the `with_*` builders to derive a modified copy.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseGuardPolicy {
    pub max_rows_per_query: u64,
    pub max_rows_per_minute: u64,

    pub require_where_on_update: bool,
    pub require_where_on_delete: bool,
    pub require_limit_on_select: bool,

    pub block_destructive: bool,
    pub block_schema_changes: bool,
    pub block_select_star: bool,
    pub block_union: bool,

    /// If set, only these tables may be referenced (whitelist mode).
    pub allowed_tables: Option<HashSet<String>>,
    pub blocked_tables: HashSet<String>,

    pub detect_sensitive_data: bool,
    pub block_sensitive_data: bool,
    pub sensitive_columns: HashSet<String>,

    pub custom_block_patterns: Vec<String>,

    pub log_all_queries: bool,
    pub log_blocked_queries: bool,
}

fn default_sensitive_columns() -> HashSet<String> {
    [
        "password", "passwd", "pwd", "secret", "token", "api_key", "apikey", "ssn",
        "social_security", "credit_card", "cc_number", "cvv", "bank_account",
        "routing_number", "private_key", "secret_key",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for DatabaseGuardPolicy {
    fn default() -> Self {
        POLICY_MODERATE.clone()
    }
}

impl DatabaseGuardPolicy {
    pub fn with_max_rows(mut self, limit: u64) -> Self {
        self.max_rows_per_query = limit;
        self
    }

    pub fn with_allowed_tables(mut self, tables: HashSet<String>) -> Self {
        self.allowed_tables = Some(tables);
        self
    }

    pub fn with_blocked_tables(mut self, tables: HashSet<String>) -> Self {
        self.blocked_tables = tables;
        self
    }

    pub fn with_sensitive_columns(mut self, columns: HashSet<String>) -> Self {
        self.sensitive_columns = columns;
        self
    }

    pub fn with_custom_block_patterns(mut self, patterns: Vec<String>) -> Self {
        self.custom_block_patterns = patterns;
        self
    }

    /// Serializes the policy to a human-editable YAML document, for
    /// operators who keep presets in version control rather than code.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Parses a policy previously produced by [`Self::to_yaml`].
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

/// Low row caps, `require_limit_on_select`, and `block_sensitive_data`
/// all on — every structural block enabled.
pub static POLICY_STRICT: std::sync::LazyLock<DatabaseGuardPolicy> = std::sync::LazyLock::new(|| DatabaseGuardPolicy {
    max_rows_per_query: 100,
    max_rows_per_minute: 10_000,
    require_where_on_update: true,
    require_where_on_delete: true,
    require_limit_on_select: true,
    block_destructive: true,
    block_schema_changes: true,
    block_select_star: true,
    block_union: true,
    allowed_tables: None,
    blocked_tables: HashSet::new(),
    detect_sensitive_data: true,
    block_sensitive_data: true,
    sensitive_columns: default_sensitive_columns(),
    custom_block_patterns: Vec::new(),
    log_all_queries: false,
    log_blocked_queries: true,
});

/// Balanced defaults: structural blocks on, sensitive-data access is
/// observed but not blocked. Used when no policy is specified.
pub static POLICY_MODERATE: std::sync::LazyLock<DatabaseGuardPolicy> = std::sync::LazyLock::new(|| DatabaseGuardPolicy {
    max_rows_per_query: 1_000,
    max_rows_per_minute: 10_000,
    require_where_on_update: true,
    require_where_on_delete: true,
    require_limit_on_select: false,
    block_destructive: true,
    block_schema_changes: true,
    block_select_star: true,
    block_union: true,
    allowed_tables: None,
    blocked_tables: HashSet::new(),
    detect_sensitive_data: true,
    block_sensitive_data: false,
    sensitive_columns: default_sensitive_columns(),
    custom_block_patterns: Vec::new(),
    log_all_queries: false,
    log_blocked_queries: true,
});

/// No destructive/schema/select-star blocks. UNION is still blocked to
/// preserve injection protection even at the loosest preset.
pub static POLICY_PERMISSIVE: std::sync::LazyLock<DatabaseGuardPolicy> = std::sync::LazyLock::new(|| DatabaseGuardPolicy {
    max_rows_per_query: 10_000,
    max_rows_per_minute: 10_000,
    require_where_on_update: true,
    require_where_on_delete: true,
    require_limit_on_select: false,
    block_destructive: false,
    block_schema_changes: false,
    block_select_star: false,
    block_union: true,
    allowed_tables: None,
    blocked_tables: HashSet::new(),
    detect_sensitive_data: true,
    block_sensitive_data: false,
    sensitive_columns: default_sensitive_columns(),
    custom_block_patterns: Vec::new(),
    log_all_queries: false,
    log_blocked_queries: true,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_blocks_more_than_permissive() {
        assert!(POLICY_STRICT.block_destructive);
        assert!(!POLICY_PERMISSIVE.block_destructive);
        assert!(POLICY_STRICT.max_rows_per_query < POLICY_PERMISSIVE.max_rows_per_query);
    }

    #[test]
    fn permissive_still_blocks_union() {
        assert!(POLICY_PERMISSIVE.block_union);
    }

    #[test]
    fn default_policy_is_moderate() {
        let default = DatabaseGuardPolicy::default();
        assert_eq!(default.max_rows_per_query, POLICY_MODERATE.max_rows_per_query);
    }

    #[test]
    fn policy_round_trips_through_yaml() {
        let yaml = POLICY_STRICT.to_yaml().unwrap();
        let restored = DatabaseGuardPolicy::from_yaml(&yaml).unwrap();
        assert_eq!(restored.max_rows_per_query, POLICY_STRICT.max_rows_per_query);
        assert_eq!(restored.block_sensitive_data, POLICY_STRICT.block_sensitive_data);
        assert_eq!(restored.sensitive_columns, POLICY_STRICT.sensitive_columns);
    }
}
