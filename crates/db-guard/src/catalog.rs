//! Compiled SQL-dialect-agnostic pattern catalog: injection, destructive,
//! schema/privilege, excessive-data, and sensitive-column families.
//!
//! Ported field-for-field from `original_source/.../database/patterns.py`
//! (`SQL_INJECTION_PATTERNS`, `DESTRUCTIVE_PATTERNS`, `SCHEMA_PATTERNS`,
//! `EXCESSIVE_DATA_PATTERNS`, `SENSITIVE_DATA_PATTERNS`). This catalog is
//! independent of `pattern_gate::PatternCatalog`: it carries
//! `ViolationType`/`SensitiveDataType` rather than `Gate`, since SQL
//! queries aren't run through the THSP gate order, but reuses the same
//! compile-once-reject-on-failure construction discipline.

use std::collections::HashSet;

use regex::Regex;

use policy_core::{PatternCompileError, RiskLevel};

use crate::types::{SensitiveDataType, ViolationType};

/// One immutable SQL detection rule.
pub struct DetectionPattern {
    pub id: &'static str,
    pub violation_type: ViolationType,
    pub risk: RiskLevel,
    pub description: &'static str,
    pub remediation: &'static str,
    regex: Regex,
}

impl DetectionPattern {
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

/// One sensitive-column detection rule.
pub struct SensitiveDataPattern {
    pub id: &'static str,
    pub data_type: SensitiveDataType,
    pub description: &'static str,
    regex: Regex,
}

impl SensitiveDataPattern {
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.find(text).map(|m| m.as_str())
    }
}

struct PatternSpec {
    id: &'static str,
    violation_type: ViolationType,
    risk: RiskLevel,
    description: &'static str,
    remediation: &'static str,
    pattern: &'static str,
}

struct SensitiveSpec {
    id: &'static str,
    data_type: SensitiveDataType,
    description: &'static str,
    pattern: &'static str,
}

const SQL_INJECTION_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        id: "sqli_union_select",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Critical,
        description: "UNION SELECT detected: common SQL injection technique",
        remediation: "Use parameterized queries. Never concatenate user input into SQL.",
        pattern: r"\bUNION\s+(ALL\s+)?SELECT\b",
    },
    PatternSpec {
        id: "sqli_comment_injection",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::High,
        description: "SQL comment sequence at end of query: potential injection",
        remediation: "Validate and sanitize all inputs. Use parameterized queries.",
        pattern: r"(--|#|/\*.*\*/)\s*$",
    },
    PatternSpec {
        id: "sqli_or_true",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Critical,
        description: "OR 1=1 tautology detected: classic SQL injection",
        remediation: "Never trust user input. Use prepared statements.",
        pattern: r#"\bOR\s+['"]?1['"]?\s*=\s*['"]?1['"]?"#,
    },
    PatternSpec {
        id: "sqli_or_always_true",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Critical,
        description: "OR condition with comment: SQL injection attempt",
        remediation: "Use parameterized queries. Validate all inputs.",
        pattern: r#"\bOR\s+['"]?\w+['"]?\s*=\s*['"]?\w+['"]?\s*--"#,
    },
    PatternSpec {
        id: "sqli_semicolon_multi",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Critical,
        description: "Multiple statements detected: stacked query injection",
        remediation: "Disable multiple statements. Use single-query prepared statements.",
        pattern: r";\s*(SELECT|INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|EXEC)",
    },
    PatternSpec {
        id: "sqli_hex_encoding",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Medium,
        description: "Hex-encoded value detected: potential encoding bypass",
        remediation: "Decode and validate hex values. Use allowlists for expected values.",
        pattern: r"0x[0-9a-fA-F]{4,}",
    },
    PatternSpec {
        id: "sqli_char_function",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::High,
        description: "CHAR() function detected: potential encoding bypass",
        remediation: "Block dynamic character construction. Use parameterized queries.",
        pattern: r"\bCHAR\s*\(\s*\d+\s*(,\s*\d+\s*)*\)",
    },
    PatternSpec {
        id: "sqli_sleep_benchmark",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Critical,
        description: "Time-based SQL injection attempt detected",
        remediation: "Block time-delay functions. Monitor for slow queries.",
        pattern: r"\b(SLEEP|BENCHMARK|WAITFOR\s+DELAY|pg_sleep)\s*\(",
    },
    PatternSpec {
        id: "sqli_into_outfile",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Critical,
        description: "File write attempt detected: potential data exfiltration",
        remediation: "Revoke FILE privilege. Block file operations in queries.",
        pattern: r"\bINTO\s+(OUT|DUMP)FILE\b",
    },
    PatternSpec {
        id: "sqli_load_file",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::Critical,
        description: "File read attempt detected: potential data exfiltration",
        remediation: "Revoke FILE privilege. Block file operations.",
        pattern: r"\bLOAD_FILE\s*\(",
    },
    PatternSpec {
        id: "sqli_information_schema",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::High,
        description: "Information schema access: database enumeration attempt",
        remediation: "Restrict access to system tables. Use least-privilege accounts.",
        pattern: r"\bINFORMATION_SCHEMA\b",
    },
    PatternSpec {
        id: "sqli_sys_tables",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::High,
        description: "System table access: privilege escalation attempt",
        remediation: "Use restricted database accounts. Block system table access.",
        pattern: r"\b(sysobjects|syscolumns|pg_catalog|mysql\.user)\b",
    },
];

const DESTRUCTIVE_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        id: "destructive_drop",
        violation_type: ViolationType::DestructiveOperation,
        risk: RiskLevel::Critical,
        description: "DROP statement detected: destructive operation",
        remediation: "Use soft deletes. Require explicit confirmation for destructive ops.",
        pattern: r"\bDROP\s+(TABLE|DATABASE|SCHEMA|INDEX)\b",
    },
    PatternSpec {
        id: "destructive_truncate",
        violation_type: ViolationType::DestructiveOperation,
        risk: RiskLevel::Critical,
        description: "TRUNCATE detected: will delete all data",
        remediation: "Use DELETE with WHERE. Implement backup before truncate.",
        pattern: r"\bTRUNCATE\s+TABLE\b",
    },
    PatternSpec {
        id: "destructive_delete_all",
        violation_type: ViolationType::DestructiveOperation,
        risk: RiskLevel::High,
        description: "DELETE without WHERE: will delete all rows",
        remediation: "Always use WHERE clause with DELETE statements.",
        pattern: r"\bDELETE\s+FROM\s+\w+\s*(;|$)",
    },
    // Matches any UPDATE...SET statement; the guard additionally requires
    // the query to lack a WHERE token before counting this as a
    // violation (the `regex` crate has no negative lookahead, which the
    // pre-distillation Python pattern relied on here).
    PatternSpec {
        id: "destructive_update_all",
        violation_type: ViolationType::DestructiveOperation,
        risk: RiskLevel::High,
        description: "UPDATE without WHERE: will update all rows",
        remediation: "Always use WHERE clause with UPDATE statements.",
        pattern: r"\bUPDATE\s+\w+\s+SET\b",
    },
];

const SCHEMA_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        id: "schema_create",
        violation_type: ViolationType::SchemaModification,
        risk: RiskLevel::High,
        description: "CREATE statement detected: schema modification",
        remediation: "Use migration tools. Require DBA approval for schema changes.",
        pattern: r"\bCREATE\s+(TABLE|DATABASE|SCHEMA|INDEX|VIEW|PROCEDURE|FUNCTION|TRIGGER)\b",
    },
    PatternSpec {
        id: "schema_alter",
        violation_type: ViolationType::SchemaModification,
        risk: RiskLevel::High,
        description: "ALTER statement detected: schema modification",
        remediation: "Use migration tools. Version control all schema changes.",
        pattern: r"\bALTER\s+(TABLE|DATABASE|SCHEMA|INDEX|VIEW|PROCEDURE|FUNCTION)\b",
    },
    PatternSpec {
        id: "schema_grant_revoke",
        violation_type: ViolationType::PrivilegeEscalation,
        risk: RiskLevel::Critical,
        description: "GRANT/REVOKE detected: privilege modification attempt",
        remediation: "Only DBAs should modify privileges. Use least-privilege accounts.",
        pattern: r"\b(GRANT|REVOKE)\s+",
    },
];

const EXCESSIVE_DATA_PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        id: "excessive_select_star",
        violation_type: ViolationType::ExcessiveData,
        risk: RiskLevel::Medium,
        description: "SELECT * detected: may return excessive or sensitive data",
        remediation: "Explicitly list required columns. Use column allowlists.",
        pattern: r"\bSELECT\s+\*\s+FROM\b",
    },
    PatternSpec {
        id: "excessive_union",
        violation_type: ViolationType::SqlInjection,
        risk: RiskLevel::High,
        description: "UNION is blocked: potential SQL injection vector",
        remediation: "Use separate queries or JOINs instead of UNION.",
        pattern: r"\bUNION\b",
    },
];

const SENSITIVE_DATA_PATTERNS: &[SensitiveSpec] = &[
    SensitiveSpec {
        id: "sensitive_password",
        data_type: SensitiveDataType::Authentication,
        description: "Password field access detected",
        pattern: r"\b(password|passwd|pwd|pass_hash|password_hash)\b",
    },
    SensitiveSpec {
        id: "sensitive_token",
        data_type: SensitiveDataType::Authentication,
        description: "Authentication token field access detected",
        pattern: r"\b(token|api_key|apikey|secret_key|access_token|refresh_token|auth_token)\b",
    },
    SensitiveSpec {
        id: "sensitive_private_key",
        data_type: SensitiveDataType::Authentication,
        description: "Cryptographic key field access detected",
        pattern: r"\b(private_key|secret|signing_key|encryption_key)\b",
    },
    SensitiveSpec {
        id: "sensitive_credit_card",
        data_type: SensitiveDataType::Financial,
        description: "Credit card field access detected",
        pattern: r"\b(credit_card|cc_number|card_number|cvv|cvc|card_cvc)\b",
    },
    SensitiveSpec {
        id: "sensitive_bank",
        data_type: SensitiveDataType::Financial,
        description: "Bank account field access detected",
        pattern: r"\b(bank_account|account_number|routing_number|iban|swift_code)\b",
    },
    SensitiveSpec {
        id: "sensitive_ssn",
        data_type: SensitiveDataType::Legal,
        description: "Social Security Number field access detected",
        pattern: r"\b(ssn|social_security|social_security_number|national_id)\b",
    },
    SensitiveSpec {
        id: "sensitive_passport",
        data_type: SensitiveDataType::Legal,
        description: "Passport/visa field access detected",
        pattern: r"\b(passport|passport_number|passport_id|visa_number)\b",
    },
    SensitiveSpec {
        id: "sensitive_drivers",
        data_type: SensitiveDataType::Legal,
        description: "Driver's license field access detected",
        pattern: r"\b(drivers_license|driver_license|license_number|dl_number)\b",
    },
    SensitiveSpec {
        id: "sensitive_dob",
        data_type: SensitiveDataType::Pii,
        description: "Date of birth field access detected",
        pattern: r"\b(date_of_birth|dob|birth_date|birthdate)\b",
    },
    SensitiveSpec {
        id: "sensitive_address",
        data_type: SensitiveDataType::Pii,
        description: "Home address field access detected",
        pattern: r"\b(home_address|street_address|full_address|residential_address)\b",
    },
    SensitiveSpec {
        id: "sensitive_phone",
        data_type: SensitiveDataType::Pii,
        description: "Phone number field access detected",
        pattern: r"\b(phone_number|mobile_number|cell_phone|telephone)\b",
    },
    SensitiveSpec {
        id: "sensitive_email",
        data_type: SensitiveDataType::Pii,
        description: "Email field access detected",
        pattern: r"\b(email|email_address|personal_email)\b",
    },
    SensitiveSpec {
        id: "sensitive_health",
        data_type: SensitiveDataType::Health,
        description: "Health/medical field access detected (HIPAA)",
        pattern: r"\b(medical_record|health_data|diagnosis|prescription|patient_id|mrn)\b",
    },
];

/// The compiled, queryable SQL pattern corpus. Partitioned by violation
/// type at construction time so [`DatabaseGuard`](crate::guard::DatabaseGuard)
/// can selectively run only the families its policy enables.
pub struct SqlPatternCatalog {
    injection: Vec<DetectionPattern>,
    destructive: Vec<DetectionPattern>,
    schema: Vec<DetectionPattern>,
    excessive: Vec<DetectionPattern>,
    sensitive: Vec<SensitiveDataPattern>,
}

fn compile(spec: &PatternSpec, seen: &mut HashSet<&'static str>) -> Result<DetectionPattern, PatternCompileError> {
    if !seen.insert(spec.id) {
        return Err(PatternCompileError::DuplicateId(spec.id.to_string()));
    }
    let regex = Regex::new(&format!("(?i){}", spec.pattern)).map_err(|source| PatternCompileError::Regex {
        id: spec.id.to_string(),
        source,
    })?;
    Ok(DetectionPattern {
        id: spec.id,
        violation_type: spec.violation_type,
        risk: spec.risk,
        description: spec.description,
        remediation: spec.remediation,
        regex,
    })
}

impl SqlPatternCatalog {
    /// Compiles the built-in SQL pattern corpus. Compile failures and
    /// duplicate ids are fatal, as with [`pattern_gate::PatternCatalog`].
    pub fn builtin() -> Result<Self, PatternCompileError> {
        let mut seen = HashSet::new();
        let compile_all = |specs: &[PatternSpec], seen: &mut HashSet<&'static str>| -> Result<Vec<DetectionPattern>, PatternCompileError> {
            specs.iter().map(|s| compile(s, seen)).collect()
        };
        let injection = compile_all(SQL_INJECTION_PATTERNS, &mut seen)?;
        let destructive = compile_all(DESTRUCTIVE_PATTERNS, &mut seen)?;
        let schema = compile_all(SCHEMA_PATTERNS, &mut seen)?;
        let excessive = compile_all(EXCESSIVE_DATA_PATTERNS, &mut seen)?;

        let mut sensitive_seen = HashSet::new();
        let mut sensitive = Vec::with_capacity(SENSITIVE_DATA_PATTERNS.len());
        for spec in SENSITIVE_DATA_PATTERNS {
            if !sensitive_seen.insert(spec.id) {
                return Err(PatternCompileError::DuplicateId(spec.id.to_string()));
            }
            let regex = Regex::new(&format!("(?i){}", spec.pattern)).map_err(|source| PatternCompileError::Regex {
                id: spec.id.to_string(),
                source,
            })?;
            sensitive.push(SensitiveDataPattern {
                id: spec.id,
                data_type: spec.data_type,
                description: spec.description,
                regex,
            });
        }

        Ok(SqlPatternCatalog { injection, destructive, schema, excessive, sensitive })
    }

    pub fn injection(&self) -> &[DetectionPattern] {
        &self.injection
    }

    pub fn destructive(&self) -> &[DetectionPattern] {
        &self.destructive
    }

    pub fn schema(&self) -> &[DetectionPattern] {
        &self.schema
    }

    pub fn excessive(&self) -> &[DetectionPattern] {
        &self.excessive
    }

    pub fn sensitive(&self) -> &[SensitiveDataPattern] {
        &self.sensitive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_compiles_without_duplicate_ids() {
        let catalog = SqlPatternCatalog::builtin().expect("builtin SQL catalog must compile");
        assert!(!catalog.injection().is_empty());
        assert!(!catalog.sensitive().is_empty());
    }

    #[test]
    fn union_select_matches_injection_family() {
        let catalog = SqlPatternCatalog::builtin().unwrap();
        let hit = catalog.injection().iter().find(|p| p.id == "sqli_union_select").unwrap();
        assert!(hit.find("SELECT * FROM users UNION SELECT password FROM admins").is_some());
    }

    #[test]
    fn drop_table_matches_destructive_family() {
        let catalog = SqlPatternCatalog::builtin().unwrap();
        assert!(catalog.destructive().iter().any(|p| p.find("DROP TABLE users").is_some()));
    }

    #[test]
    fn sensitive_password_column_matches() {
        let catalog = SqlPatternCatalog::builtin().unwrap();
        let hit = catalog.sensitive().iter().find(|p| p.id == "sensitive_password").unwrap();
        assert!(hit.find("SELECT password FROM users").is_some());
    }
}
