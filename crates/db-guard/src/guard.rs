//! SQL query validation: the policy gate an agent's database tool call
//! runs through before a query reaches the database driver.
//!
//! Grounded on `original_source/.../database/guard.py`'s
//! `DatabaseGuard.validate()` eight-step algorithm.

use std::collections::{HashSet, VecDeque};
use std::sync::LazyLock;

use parking_lot::Mutex;
use regex::Regex;

use policy_core::{audit, Blocked, RiskLevel};

use crate::catalog::SqlPatternCatalog;
use crate::policy::DatabaseGuardPolicy;
use crate::types::{PolicyViolation, QueryClassification, QueryType, SensitiveDataMatch, ViolationType};

// Table-extraction and clause-presence regexes are compiled once at
// first use and shared across every `validate` call; only the
// policy's own custom/sensitive-column patterns are compiled per guard
// instance (they depend on runtime configuration).
static FROM_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bFROM\s+(\w+)").unwrap());
static JOIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bJOIN\s+(\w+)").unwrap());
static INTO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bINTO\s+(\w+)").unwrap());
static UPDATE_TABLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bUPDATE\s+(\w+)").unwrap());
static WHERE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bWHERE\b").unwrap());
static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bLIMIT\b").unwrap());

/// The result of validating one query: classification, violations,
/// sensitive-data matches, and the derived allow/deny decision.
#[derive(Debug, Clone, serde::Serialize)]
pub struct QueryValidationResult {
    pub allowed: bool,
    pub risk_level: RiskLevel,
    pub query_type: QueryType,
    pub violations: Vec<PolicyViolation>,
    pub sensitive_data: Vec<SensitiveDataMatch>,
    pub warnings: Vec<String>,
    pub tables_accessed: HashSet<String>,
}

impl QueryValidationResult {
    pub fn blocked(&self) -> bool {
        !self.allowed
    }

    /// The first violation's description, or `None` if allowed.
    pub fn reason(&self) -> Option<&str> {
        if self.allowed {
            return None;
        }
        self.violations.first().map(|v| v.description.as_str())
    }

    pub fn has_sensitive_data(&self) -> bool {
        !self.sensitive_data.is_empty()
    }

    pub fn is_destructive(&self) -> bool {
        self.query_type.is_destructive()
    }
}

/// Aggregate counters over every call to [`DatabaseGuard::validate`].
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GuardStats {
    pub total: u64,
    pub allowed: u64,
    pub blocked: u64,
}

impl GuardStats {
    pub fn block_rate(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.blocked as f64 / self.total as f64 }
    }
}

/// Validates SQL query strings against a [`DatabaseGuardPolicy`],
/// classifying query type and tables, scanning the shared
/// [`SqlPatternCatalog`], enforcing table allow/blocklists and WHERE
/// requirements, and flagging sensitive-column access.
pub struct DatabaseGuard {
    policy: DatabaseGuardPolicy,
    catalog: SqlPatternCatalog,
    strict_mode: bool,
    custom_patterns: Vec<Regex>,
    history: Mutex<VecDeque<QueryValidationResult>>,
    stats: Mutex<GuardStats>,
    audit: audit::AuditLog,
}

impl DatabaseGuard {
    /// Builds a guard over `policy`, compiling the built-in SQL catalog
    /// and the policy's custom block patterns. Panics only if the
    /// built-in catalog itself fails to compile (a startup-fatal bug,
    /// never a function of caller input).
    pub fn new(policy: DatabaseGuardPolicy, strict_mode: bool) -> Self {
        let catalog = SqlPatternCatalog::builtin().expect("builtin SQL catalog must compile");
        let custom_patterns = policy
            .custom_block_patterns
            .iter()
            .filter_map(|p| Regex::new(&format!("(?i){p}")).ok())
            .collect();
        DatabaseGuard {
            policy,
            catalog,
            strict_mode,
            custom_patterns,
            history: Mutex::new(VecDeque::new()),
            stats: Mutex::new(GuardStats::default()),
            audit: audit::AuditLog::new(1000),
        }
    }

    pub fn moderate() -> Self {
        DatabaseGuard::new(DatabaseGuardPolicy::default(), false)
    }

    pub fn policy(&self) -> &DatabaseGuardPolicy {
        &self.policy
    }

    pub fn stats(&self) -> GuardStats {
        self.stats.lock().clone()
    }

    pub fn recent_blocked(&self, n: usize) -> Vec<QueryValidationResult> {
        let history = self.history.lock();
        history.iter().rev().filter(|r| r.blocked()).take(n).cloned().collect()
    }

    /// Validates `query` and returns a [`QueryValidationResult`].
    ///
    /// When `strict_mode` is set at construction, a blocked result is
    /// additionally returned as `Err(Blocked::Query)` so callers that
    /// prefer exception-style control flow can `?` past it; the
    /// non-strict caller just inspects `result.allowed`.
    pub fn validate(&self, query: &str) -> Result<QueryValidationResult, Blocked> {
        let result = self.validate_inner(query);
        if self.strict_mode && result.blocked() {
            return Err(Blocked::Query {
                reason: result.reason().unwrap_or("query blocked by policy").to_string(),
            });
        }
        Ok(result)
    }

    /// Strict-mode variant for callers that want exception-style control
    /// flow regardless of the `strict_mode` flag passed to [`DatabaseGuard::new`]:
    /// a blocked query always comes back as `Err(Blocked::Query)`.
    pub fn validate_strict(&self, query: &str) -> Result<QueryValidationResult, Blocked> {
        let result = self.validate_inner(query);
        if result.blocked() {
            return Err(Blocked::Query {
                reason: result.reason().unwrap_or("query blocked by policy").to_string(),
            });
        }
        Ok(result)
    }

    fn validate_inner(&self, query: &str) -> QueryValidationResult {
        let query = query.trim();
        if query.is_empty() {
            return QueryValidationResult {
                allowed: true,
                risk_level: RiskLevel::Safe,
                query_type: QueryType::Unknown,
                violations: Vec::new(),
                sensitive_data: Vec::new(),
                warnings: vec!["empty query".to_string()],
                tables_accessed: HashSet::new(),
            };
        }

        let query_type = detect_query_type(query);
        let tables = extract_tables(query);

        let mut violations = Vec::new();
        violations.extend(self.check_injection_patterns(query));
        violations.extend(self.check_destructive_patterns(query));
        violations.extend(self.check_schema_patterns(query));
        violations.extend(self.check_excessive_data_patterns(query));
        violations.extend(self.check_custom_patterns(query));
        violations.extend(self.check_table_access(&tables));
        violations.extend(self.check_where_clause(query, query_type));
        if self.policy.require_limit_on_select && query_type == QueryType::Select && !LIMIT_RE.is_match(query) {
            violations.push(
                PolicyViolation::new(ViolationType::ExcessiveData, RiskLevel::Medium, "SELECT requires a LIMIT clause")
                    .with_remediation("Add a LIMIT clause to bound the result set."),
            );
        }

        let sensitive_data = if self.policy.detect_sensitive_data {
            self.detect_sensitive_data(query)
        } else {
            Vec::new()
        };
        if !sensitive_data.is_empty() && self.policy.block_sensitive_data {
            let ids: Vec<_> = sensitive_data.iter().map(|m| m.pattern_id.clone()).collect();
            violations.push(PolicyViolation::new(
                ViolationType::SensitiveData,
                RiskLevel::High,
                format!("Query accesses sensitive data: {}", ids.join(", ")),
            ));
        }

        let risk_level = if !violations.is_empty() {
            RiskLevel::aggregate(violations.iter().map(|v| v.risk_level))
        } else if !sensitive_data.is_empty() {
            RiskLevel::Medium
        } else {
            RiskLevel::Safe
        };

        let allowed = violations.is_empty();

        let result = QueryValidationResult {
            allowed,
            risk_level,
            query_type,
            violations,
            sensitive_data,
            warnings: Vec::new(),
            tables_accessed: tables,
        };

        self.record(query, &result);
        result
    }

    fn check_injection_patterns(&self, query: &str) -> Vec<PolicyViolation> {
        self.catalog
            .injection()
            .iter()
            .filter_map(|p| {
                p.find(query).map(|m| {
                    PolicyViolation::new(p.violation_type, p.risk, p.description)
                        .with_pattern_matched(m)
                        .with_remediation(p.remediation)
                })
            })
            .collect()
    }

    fn check_destructive_patterns(&self, query: &str) -> Vec<PolicyViolation> {
        if !self.policy.block_destructive {
            return Vec::new();
        }
        let has_where = WHERE_RE.is_match(query);
        self.catalog
            .destructive()
            .iter()
            .filter(|p| p.id != "destructive_update_all" || !has_where)
            .filter_map(|p| {
                p.find(query).map(|m| {
                    PolicyViolation::new(p.violation_type, p.risk, p.description)
                        .with_pattern_matched(m)
                        .with_remediation(p.remediation)
                })
            })
            .collect()
    }

    fn check_schema_patterns(&self, query: &str) -> Vec<PolicyViolation> {
        if !self.policy.block_schema_changes {
            return Vec::new();
        }
        self.catalog
            .schema()
            .iter()
            .filter_map(|p| {
                p.find(query).map(|m| {
                    PolicyViolation::new(p.violation_type, p.risk, p.description)
                        .with_pattern_matched(m)
                        .with_remediation(p.remediation)
                })
            })
            .collect()
    }

    fn check_excessive_data_patterns(&self, query: &str) -> Vec<PolicyViolation> {
        self.catalog
            .excessive()
            .iter()
            .filter(|p| match p.id {
                "excessive_select_star" => self.policy.block_select_star,
                "excessive_union" => self.policy.block_union,
                _ => true,
            })
            .filter_map(|p| {
                p.find(query).map(|m| {
                    PolicyViolation::new(p.violation_type, p.risk, p.description)
                        .with_pattern_matched(m)
                        .with_remediation(p.remediation)
                })
            })
            .collect()
    }

    fn check_custom_patterns(&self, query: &str) -> Vec<PolicyViolation> {
        self.custom_patterns
            .iter()
            .filter_map(|regex| {
                regex.find(query).map(|m| {
                    PolicyViolation::new(ViolationType::ProhibitedPattern, RiskLevel::High, format!("Custom blocked pattern: {}", regex.as_str()))
                        .with_pattern_matched(m.as_str())
                })
            })
            .collect()
    }

    fn check_table_access(&self, tables: &HashSet<String>) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        if let Some(allowed) = &self.policy.allowed_tables {
            let unauthorized: Vec<_> = tables.difference(allowed).cloned().collect();
            if !unauthorized.is_empty() {
                violations.push(
                    PolicyViolation::new(
                        ViolationType::UnauthorizedTable,
                        RiskLevel::High,
                        format!("Unauthorized table access: {}", unauthorized.join(", ")),
                    )
                    .with_remediation("Only access tables in the allowed list."),
                );
            }
        }
        if !self.policy.blocked_tables.is_empty() {
            let blocked: Vec<_> = tables.intersection(&self.policy.blocked_tables).cloned().collect();
            if !blocked.is_empty() {
                violations.push(
                    PolicyViolation::new(ViolationType::UnauthorizedTable, RiskLevel::High, format!("Blocked table access: {}", blocked.join(", ")))
                        .with_remediation("This table is blocked by policy."),
                );
            }
        }
        violations
    }

    fn check_where_clause(&self, query: &str, query_type: QueryType) -> Vec<PolicyViolation> {
        let mut violations = Vec::new();
        let has_where = WHERE_RE.is_match(query);
        if query_type == QueryType::Update && self.policy.require_where_on_update && !has_where {
            violations.push(
                PolicyViolation::new(ViolationType::MissingWhere, RiskLevel::High, "UPDATE without WHERE clause: would affect all rows")
                    .with_remediation("Add WHERE clause to limit affected rows."),
            );
        }
        if query_type == QueryType::Delete && self.policy.require_where_on_delete && !has_where {
            violations.push(
                PolicyViolation::new(ViolationType::MissingWhere, RiskLevel::Critical, "DELETE without WHERE clause: would delete all rows")
                    .with_remediation("Add WHERE clause to specify rows to delete."),
            );
        }
        violations
    }

    fn detect_sensitive_data(&self, query: &str) -> Vec<SensitiveDataMatch> {
        let mut matches = Vec::new();
        for pattern in self.catalog.sensitive() {
            if let Some(m) = pattern.find(query) {
                matches.push(SensitiveDataMatch {
                    data_type: pattern.data_type,
                    pattern_id: pattern.id.to_string(),
                    column_name: Some(m.to_string()),
                    description: pattern.description.to_string(),
                });
            }
        }
        for column in &self.policy.sensitive_columns {
            let already = matches.iter().any(|m| m.column_name.as_deref().is_some_and(|c| c.eq_ignore_ascii_case(column)));
            if already {
                continue;
            }
            if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(column))) {
                if re.is_match(query) {
                    matches.push(SensitiveDataMatch {
                        data_type: crate::types::SensitiveDataType::Pii,
                        pattern_id: format!("custom_{column}"),
                        column_name: Some(column.clone()),
                        description: format!("Custom sensitive column: {column}"),
                    });
                }
            }
        }
        matches
    }

    fn record(&self, query: &str, result: &QueryValidationResult) {
        tracing::info!(
            allowed = result.allowed,
            risk = %result.risk_level,
            query_type = ?result.query_type,
            violations = result.violations.len(),
            "query validation complete"
        );

        let mut stats = self.stats.lock();
        stats.total += 1;
        if result.allowed {
            stats.allowed += 1;
        } else {
            stats.blocked += 1;
        }
        drop(stats);

        let mut history = self.history.lock();
        history.push_back(result.clone());
        while history.len() > 1000 {
            history.pop_front();
        }
        drop(history);

        if self.policy.log_all_queries || (self.policy.log_blocked_queries && result.blocked()) {
            let entry = audit::AuditEntry::new("db-guard", if result.allowed { "allow" } else { "block" }, result.risk_level)
                .with_concerns(result.violations.iter().map(|v| v.description.clone()).collect())
                .with_content(query);
            self.audit.push(entry);
        }
    }
}

fn detect_query_type(query: &str) -> QueryType {
    let upper = query.trim_start().to_uppercase();
    const TYPE_MAP: &[(&str, QueryType)] = &[
        ("SELECT", QueryType::Select),
        ("INSERT", QueryType::Insert),
        ("UPDATE", QueryType::Update),
        ("DELETE", QueryType::Delete),
        ("CREATE", QueryType::Create),
        ("DROP", QueryType::Drop),
        ("ALTER", QueryType::Alter),
        ("TRUNCATE", QueryType::Truncate),
        ("EXEC", QueryType::Execute),
    ];
    for (prefix, query_type) in TYPE_MAP {
        if upper.starts_with(prefix) {
            return *query_type;
        }
    }
    QueryType::Unknown
}

/// Extracts lower-cased table identifiers referenced by FROM/JOIN/INTO/
/// UPDATE clauses. Does not parse the statement; duplicates across
/// clauses collapse via the returned set.
fn extract_tables(query: &str) -> HashSet<String> {
    let mut tables = HashSet::new();
    for re in [&*FROM_RE, &*JOIN_RE, &*INTO_RE, &*UPDATE_TABLE_RE] {
        for cap in re.captures_iter(query) {
            tables.insert(cap[1].to_lowercase());
        }
    }
    tables
}

/// Classifies a query without running it through a policy. Useful for
/// callers that just want `{type, tables}` without a full validation.
pub fn classify(query: &str) -> QueryClassification {
    QueryClassification {
        query_type: detect_query_type(query),
        tables: extract_tables(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{POLICY_MODERATE, POLICY_PERMISSIVE, POLICY_STRICT};

    #[test]
    fn simple_select_is_allowed_under_moderate() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("SELECT name, email FROM users WHERE id = 123").unwrap();
        assert!(result.allowed);
        assert_eq!(result.query_type, QueryType::Select);
        assert!(result.tables_accessed.contains("users"));
    }

    #[test]
    fn stacked_query_with_drop_is_blocked_critical() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("SELECT * FROM users; DROP TABLE users; --").unwrap();
        assert!(!result.allowed);
        assert_eq!(result.risk_level, RiskLevel::Critical);
        assert!(result.violations.iter().any(|v| v.description.contains("stacked query")));
        assert!(result.violations.iter().any(|v| v.description.contains("DROP")));
        assert!(result.tables_accessed.contains("users"));
    }

    #[test]
    fn strict_policy_requires_limit_on_select() {
        let guard = DatabaseGuard::new(POLICY_STRICT.clone(), false);
        let result = guard.validate("SELECT name FROM users WHERE id = 123").unwrap();
        assert!(!result.allowed);
        assert!(result.violations.iter().any(|v| v.description.contains("LIMIT")));
        assert!(result.risk_level >= RiskLevel::Medium);
    }

    #[test]
    fn delete_without_where_is_critical() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("DELETE FROM sessions").unwrap();
        assert!(!result.allowed);
        assert_eq!(result.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn delete_with_where_is_allowed() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("DELETE FROM sessions WHERE expired = true").unwrap();
        assert!(result.allowed);
    }

    #[test]
    fn update_without_where_is_blocked() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("UPDATE users SET is_admin = true").unwrap();
        assert!(!result.allowed);
        assert!(result.violations.iter().any(|v| v.violation_type == ViolationType::MissingWhere));
    }

    #[test]
    fn update_with_where_is_allowed() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("UPDATE users SET name = 'x' WHERE id = 1").unwrap();
        assert!(result.allowed);
    }

    #[test]
    fn sensitive_column_is_observed_not_blocked_under_moderate() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("SELECT password FROM users WHERE id = 1").unwrap();
        assert!(result.allowed);
        assert!(result.has_sensitive_data());
    }

    #[test]
    fn sensitive_column_is_blocked_under_strict() {
        let guard = DatabaseGuard::new(POLICY_STRICT.clone(), false);
        let result = guard.validate("SELECT password FROM users WHERE id = 1 LIMIT 10").unwrap();
        assert!(!result.allowed);
        assert!(result.violations.iter().any(|v| v.violation_type == ViolationType::SensitiveData));
    }

    #[test]
    fn permissive_allows_select_star_but_blocks_union() {
        let guard = DatabaseGuard::new(POLICY_PERMISSIVE.clone(), false);
        let select_star = guard.validate("SELECT * FROM products").unwrap();
        assert!(select_star.allowed);
        let union = guard.validate("SELECT id FROM a UNION SELECT id FROM b").unwrap();
        assert!(!union.allowed);
    }

    #[test]
    fn allowlisted_tables_block_other_access() {
        let policy = POLICY_MODERATE.clone().with_allowed_tables(["orders".to_string()].into_iter().collect());
        let guard = DatabaseGuard::new(policy, false);
        let result = guard.validate("SELECT id FROM users WHERE id = 1").unwrap();
        assert!(!result.allowed);
        assert!(result.violations.iter().any(|v| v.violation_type == ViolationType::UnauthorizedTable));
    }

    #[test]
    fn strict_mode_returns_blocked_error() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), true);
        let err = guard.validate("DROP TABLE users").unwrap_err();
        assert!(matches!(err, Blocked::Query { .. }));
    }

    #[test]
    fn validate_strict_raises_regardless_of_constructor_flag() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        assert!(guard.validate("DROP TABLE users").unwrap().blocked());
        let err = guard.validate_strict("DROP TABLE users").unwrap_err();
        assert!(matches!(err, Blocked::Query { .. }));
    }

    #[test]
    fn empty_query_is_allowed() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        let result = guard.validate("   ").unwrap();
        assert!(result.allowed);
        assert_eq!(result.query_type, QueryType::Unknown);
    }

    #[test]
    fn stats_track_allowed_and_blocked() {
        let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
        guard.validate("SELECT id FROM users WHERE id = 1").unwrap();
        guard.validate("DROP TABLE users").unwrap();
        let stats = guard.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.allowed, 1);
        assert_eq!(stats.blocked, 1);
        assert!((stats.block_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn classify_extracts_join_and_into_tables() {
        let c = classify("INSERT INTO orders SELECT * FROM carts JOIN users ON carts.user_id = users.id");
        assert!(c.tables.contains("orders"));
        assert!(c.tables.contains("carts"));
        assert!(c.tables.contains("users"));
    }
}
