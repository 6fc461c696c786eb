//! Cross-module integration tests: `DatabaseGuard` composed with the
//! strict/moderate/permissive presets and the `policy_core::Blocked`
//! error type a strict-mode caller actually matches on.

use db_guard::{DatabaseGuard, QueryType, POLICY_MODERATE, POLICY_PERMISSIVE, POLICY_STRICT};
use policy_core::{Blocked, RiskLevel};

#[test]
fn same_query_is_allowed_moderate_and_blocked_strict() {
    let moderate = DatabaseGuard::new(POLICY_MODERATE.clone(), false);
    let strict = DatabaseGuard::new(POLICY_STRICT.clone(), false);

    let query = "SELECT password FROM users WHERE id = 1";

    let moderate_result = moderate.validate(query).unwrap();
    assert!(moderate_result.allowed);
    assert!(moderate_result.has_sensitive_data());

    let strict_result = strict.validate(query).unwrap();
    assert!(!strict_result.allowed);
    assert_eq!(strict_result.risk_level, RiskLevel::High);
}

#[test]
fn strict_mode_surfaces_a_blocked_error_for_injection() {
    let guard = DatabaseGuard::new(POLICY_MODERATE.clone(), true);
    let err = guard.validate("SELECT * FROM users; DROP TABLE users; --").unwrap_err();
    match err {
        Blocked::Query { reason } => assert!(!reason.is_empty()),
        other => panic!("expected Blocked::Query, got {other:?}"),
    }
}

#[test]
fn permissive_preset_allows_select_star_and_tracks_stats_across_presets() {
    let permissive = DatabaseGuard::new(POLICY_PERMISSIVE.clone(), false);
    let result = permissive.validate("SELECT * FROM products").unwrap();
    assert!(result.allowed);
    assert_eq!(result.query_type, QueryType::Select);

    let stats = permissive.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.allowed, 1);
}

#[test]
fn policy_loaded_from_yaml_behaves_like_its_source_preset() {
    let yaml = POLICY_STRICT.to_yaml().unwrap();
    let restored = db_guard::DatabaseGuardPolicy::from_yaml(&yaml).unwrap();
    let guard = DatabaseGuard::new(restored, false);

    let result = guard.validate("SELECT name FROM users WHERE id = 1").unwrap();
    assert!(!result.allowed, "strict policy requires a LIMIT clause even after a YAML round trip");
}
