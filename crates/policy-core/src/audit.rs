//! Bounded audit trail and PII-safe logging helpers.
//!
//! No audit record ever carries the full content of a validated input:
//! at most a short preview, a hash of the original, and structural
//! metadata. A reusable ring buffer, since every subsystem in this
//! workspace needs one.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::verdict::RiskLevel;

const PREVIEW_MAX_CHARS: usize = 200;

/// Truncates `text` to at most [`PREVIEW_MAX_CHARS`] characters, safely
/// on a UTF-8 boundary.
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_MAX_CHARS) {
        Some((byte_idx, _)) => format!("{}\u{2026}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Hex-encoded SHA-256 of the full original text, so audit consumers can
/// correlate records without ever storing the content itself.
pub fn content_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// One record in a subsystem's bounded audit trail.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub subsystem: &'static str,
    pub decision: String,
    pub risk: RiskLevel,
    pub concerns: Vec<String>,
    pub preview: Option<String>,
    pub content_hash: Option<String>,
}

impl AuditEntry {
    pub fn new(subsystem: &'static str, decision: impl Into<String>, risk: RiskLevel) -> Self {
        AuditEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            subsystem,
            decision: decision.into(),
            risk,
            concerns: Vec::new(),
            preview: None,
            content_hash: None,
        }
    }

    pub fn with_concerns(mut self, concerns: Vec<String>) -> Self {
        self.concerns = concerns;
        self
    }

    pub fn with_content(mut self, original: &str) -> Self {
        self.preview = Some(preview(original));
        self.content_hash = Some(content_hash(original));
        self
    }
}

/// A fixed-capacity ring of audit entries. Oldest entries are evicted on
/// overflow; never grows past `capacity`.
pub struct AuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        AuditLog {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn push(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The `n` most recently pushed entries, newest last.
    pub fn recent(&self, n: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock();
        entries.iter().rev().take(n).rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Redacts well-known PII-bearing field names before they are attached to
/// a `tracing` event. Field values are also truncated to
/// [`PREVIEW_MAX_CHARS`]. This is a thin wrapper applied at call sites
/// that log caller-supplied data, not a general logging facade: the
/// facade itself is `tracing`.
pub fn redact_field(name: &str, value: &str) -> String {
    const SENSITIVE: &[&str] = &["email", "phone", "ssn", "card", "api_key", "password", "token"];
    if SENSITIVE.iter().any(|s| name.eq_ignore_ascii_case(s)) {
        "[redacted]".to_string()
    } else {
        preview(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_long_text() {
        let long = "a".repeat(500);
        let p = preview(&long);
        assert!(p.chars().count() <= PREVIEW_MAX_CHARS + 1);
        assert!(p.ends_with('\u{2026}'));
    }

    #[test]
    fn preview_leaves_short_text_untouched() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("world"));
    }

    #[test]
    fn audit_log_evicts_oldest_on_overflow() {
        let log = AuditLog::new(2);
        log.push(AuditEntry::new("test", "allow", RiskLevel::Safe));
        log.push(AuditEntry::new("test", "deny", RiskLevel::High));
        log.push(AuditEntry::new("test", "block", RiskLevel::Critical));
        assert_eq!(log.len(), 2);
        let recent = log.recent(10);
        assert_eq!(recent[0].decision, "deny");
        assert_eq!(recent[1].decision, "block");
    }

    #[test]
    fn redact_field_hides_sensitive_names() {
        assert_eq!(redact_field("email", "a@b.com"), "[redacted]");
        assert_eq!(redact_field("wallet", "0xabc"), "0xabc");
    }
}
