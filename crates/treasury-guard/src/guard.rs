//! Transaction validation: the policy gate a wallet-holding agent runs
//! every outbound call through before it is signed and broadcast.
//!
//! Grounded on `coinbase/validators/transaction.py`'s
//! `TransactionValidator.validate()`. The Python original has an
//! optional step 7.5 "fiduciary overlay" (a user-trust-score system
//! layered on top of the core nine steps) that this port omits — it is
//! a product integration concern orthogonal to the THSP/spending-limit
//! policy this crate implements, not a change in validation semantics
//! for the steps that remain (see `DESIGN.md`).

use std::collections::{HashSet, VecDeque};

use parking_lot::Mutex;
use rust_decimal::Decimal;

use policy_core::RiskLevel;

use crate::address::{self, AddressValidationResult};
use crate::chain::{self, ChainPolicy};
use crate::tracker::{SpendingSummary, SpendingTracker};

/// `^0x[fF]{64}$` MAX_UINT256 hex sentinel, `-1` sentinel, and the
/// decimal form of 2^256 - 1, ported from `UNLIMITED_APPROVAL_PATTERNS`
/// plus the `>= 10**30` numeric fallback.
const MAX_UINT256_DECIMAL: &str = "115792089237316195423570985008687907853269984665640564039457584007913129639935";
const UNLIMITED_APPROVAL_NUMERIC_THRESHOLD: &str = "1000000000000000000000000000000"; // 10**30

fn is_unlimited_approval(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed == MAX_UINT256_DECIMAL || trimmed == "-1" {
        return true;
    }
    if trimmed.len() == 66 && trimmed.starts_with("0x") && trimmed[2..].chars().all(|c| c == 'f' || c == 'F') {
        return true;
    }
    match trimmed.parse::<rust_decimal::Decimal>() {
        Ok(n) => n >= UNLIMITED_APPROVAL_NUMERIC_THRESHOLD.parse().unwrap(),
        Err(_) => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDecision {
    Approve,
    ApproveWithConfirmation,
    Reject,
    Block,
}

/// A proposed on-chain action awaiting a policy decision.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    pub sender: String,
    pub recipient: String,
    pub action: String,
    pub amount: Decimal,
    /// Raw approval value (e.g. an ERC-20 `approve` call's `amount`
    /// argument), checked for the unlimited-approval sentinel.
    pub approval_value: Option<String>,
    pub purpose: Option<String>,
}

impl TransactionRequest {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>, action: impl Into<String>, amount: Decimal) -> Self {
        TransactionRequest {
            sender: sender.into(),
            recipient: recipient.into(),
            action: action.into(),
            amount,
            approval_value: None,
            purpose: None,
        }
    }

    pub fn with_approval_value(mut self, value: impl Into<String>) -> Self {
        self.approval_value = Some(value.into());
        self
    }

    pub fn with_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.purpose = Some(purpose.into());
        self
    }
}

/// Outcome of running a [`TransactionRequest`] through [`TransactionGuard::validate`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TransactionValidationResult {
    pub decision: TransactionDecision,
    pub risk_level: RiskLevel,
    pub concerns: Vec<String>,
    pub sender_valid: bool,
    pub recipient_valid: bool,
    pub unlimited_approval_detected: bool,
}

impl TransactionValidationResult {
    pub fn is_approved(&self) -> bool {
        matches!(self.decision, TransactionDecision::Approve | TransactionDecision::ApproveWithConfirmation)
    }
}

/// Behavior knobs that aren't already captured by [`ChainPolicy`].
/// Grounded on `SentinelCoinbaseConfig`'s boolean feature flags.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub block_unlimited_approvals: bool,
    pub require_purpose_for_high_risk: bool,
    pub strict_address_validation: bool,
    pub blocked_addresses: HashSet<String>,
    pub allowed_actions: Option<HashSet<String>>,
    pub max_history_size: usize,
}

impl Default for GuardConfig {
    fn default() -> Self {
        GuardConfig {
            block_unlimited_approvals: true,
            require_purpose_for_high_risk: true,
            strict_address_validation: false,
            blocked_addresses: HashSet::new(),
            allowed_actions: None,
            max_history_size: 1000,
        }
    }
}

/// Aggregate counters over every call to [`TransactionGuard::validate`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct GuardStats {
    pub total: u64,
    pub approved: u64,
    pub blocked: u64,
    pub rejected: u64,
}

impl GuardStats {
    pub fn approval_rate(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.approved as f64 / self.total as f64 }
    }
}

/// The nine-step transaction policy gate: address validity, recipient
/// blocklist, action allow/blocklist, spending limits, rate limits,
/// unlimited-approval detection, purpose requirement, risk assessment,
/// and final decision.
pub struct TransactionGuard {
    policy: ChainPolicy,
    config: GuardConfig,
    tracker: SpendingTracker,
    history: Mutex<VecDeque<TransactionValidationResult>>,
    stats: Mutex<GuardStats>,
}

impl TransactionGuard {
    pub fn new(policy: ChainPolicy, config: GuardConfig) -> Self {
        TransactionGuard {
            policy,
            config,
            tracker: SpendingTracker::new(),
            history: Mutex::new(VecDeque::new()),
            stats: Mutex::new(GuardStats::default()),
        }
    }

    pub fn stats(&self) -> GuardStats {
        self.stats.lock().clone()
    }

    pub fn recent_history(&self, n: usize) -> Vec<TransactionValidationResult> {
        let history = self.history.lock();
        history.iter().rev().take(n).cloned().collect()
    }

    /// Records a transaction as completed, after the caller's on-chain
    /// action has actually confirmed — never at approval time, so an
    /// approved-but-unconfirmed or reverted transaction never counts
    /// against the sender's spending windows.
    pub fn record_completed(&self, sender: &str, amount: Decimal) {
        self.tracker.record_transaction(sender, amount);
    }

    /// Current hourly/daily spend and transaction counts for `wallet`.
    pub fn spending_summary(&self, wallet: &str) -> SpendingSummary {
        self.tracker.summary(wallet)
    }

    pub fn validate(&self, request: &TransactionRequest) -> TransactionValidationResult {
        let mut concerns = Vec::new();
        let mut blocking = false;

        // Step 1: sender address validity.
        let sender_result = address::validate_address(&request.sender, self.config.strict_address_validation);
        if !sender_result.valid {
            concerns.push(format!("Invalid sender address: {:?}", sender_result.status));
            blocking = true;
        }

        // Step 2: recipient address validity + blocklist.
        let recipient_result = address::validate_address(&request.recipient, self.config.strict_address_validation);
        if !recipient_result.valid {
            concerns.push(format!("Invalid recipient address: {:?}", recipient_result.status));
            blocking = true;
        }
        let recipient_lower = request.recipient.to_ascii_lowercase();
        if self.config.blocked_addresses.iter().any(|a| a.to_ascii_lowercase() == recipient_lower) {
            concerns.push("Recipient address is on the blocklist".to_string());
            blocking = true;
        }

        // Step 3: action allow/blocklist.
        if chain::is_blocked_action(&request.action) {
            concerns.push(format!("Action '{}' is unconditionally blocked", request.action));
            blocking = true;
        }
        if let Some(allowed) = &self.config.allowed_actions {
            if !allowed.contains(&request.action) {
                concerns.push(format!("Action '{}' is not in the allowlist", request.action));
                blocking = true;
            }
        }

        // Step 4: spending limits, only meaningful for a non-zero transfer
        // amount (a zero-value `approve` call has nothing to check here).
        let limits = &self.policy.spending_limits;
        let mut limit_reached = false;
        let summary = self.tracker.summary(&request.sender);
        if request.amount > Decimal::ZERO {
            if limits.exceeds_single(request.amount) {
                concerns.push(format!("Amount {} exceeds max single transaction {}", request.amount, limits.max_single_transaction));
                blocking = true;
            }
            if summary.hourly_spent + request.amount > limits.max_hourly_total {
                concerns.push("Hourly spending limit would be exceeded".to_string());
                limit_reached = true;
            }
            if summary.daily_spent + request.amount > limits.max_daily_total {
                concerns.push("Daily spending limit would be exceeded".to_string());
                limit_reached = true;
            }
        }

        // Step 5: rate limits.
        if summary.hourly_tx_count + 1 > limits.max_transactions_per_hour {
            concerns.push("Hourly transaction count limit would be exceeded".to_string());
            limit_reached = true;
        }
        if summary.daily_tx_count + 1 > limits.max_transactions_per_day {
            concerns.push("Daily transaction count limit would be exceeded".to_string());
            limit_reached = true;
        }

        // Step 6: unlimited approval detection.
        let unlimited_approval_detected = request.approval_value.as_deref().is_some_and(is_unlimited_approval);
        if unlimited_approval_detected {
            concerns.push("Unlimited approval amount detected".to_string());
            if self.config.block_unlimited_approvals {
                blocking = true;
            }
        }

        // Step 7: purpose requirement for high-risk actions. A missing
        // purpose is only ever a concern that promotes risk, never on its
        // own grounds for Reject — unlike the spending/rate-limit concerns
        // above, the source validator lets a low-amount, high-risk action
        // through (with the concern attached) when no purpose is given.
        let needs_purpose = self.config.require_purpose_for_high_risk && chain::is_high_risk_action(&request.action);
        if needs_purpose && request.purpose.as_deref().unwrap_or("").trim().is_empty() {
            concerns.push(format!("Action '{}' requires a stated purpose", request.action));
        }

        // Step 8: risk level assessment.
        let risk_level = self.assess_risk_level(request, blocking, &concerns);

        // Step 9: decision.
        let decision = if blocking {
            TransactionDecision::Block
        } else if limit_reached {
            TransactionDecision::Reject
        } else if limits.requires_confirmation(request.amount) || unlimited_approval_detected {
            TransactionDecision::ApproveWithConfirmation
        } else {
            TransactionDecision::Approve
        };

        let mut stats = self.stats.lock();
        stats.total += 1;
        match decision {
            TransactionDecision::Approve | TransactionDecision::ApproveWithConfirmation => stats.approved += 1,
            TransactionDecision::Block => stats.blocked += 1,
            TransactionDecision::Reject => stats.rejected += 1,
        }
        drop(stats);

        let result = TransactionValidationResult {
            decision,
            risk_level,
            concerns,
            sender_valid: sender_result.valid,
            recipient_valid: recipient_result.valid,
            unlimited_approval_detected,
        };

        let mut history = self.history.lock();
        history.push_back(result.clone());
        while history.len() > self.config.max_history_size {
            history.pop_front();
        }

        result
    }

    /// Critical when anything is outright blocking; otherwise scales
    /// with the action class and the amount tier relative to the
    /// confirmation threshold.
    fn assess_risk_level(&self, request: &TransactionRequest, blocking: bool, concerns: &[String]) -> RiskLevel {
        if blocking {
            return RiskLevel::Critical;
        }
        if concerns.is_empty() {
            return RiskLevel::Low;
        }
        let is_high_risk_action = chain::is_high_risk_action(&request.action);
        let amount_tier = if request.amount >= self.policy.spending_limits.max_single_transaction {
            RiskLevel::High
        } else if request.amount >= self.policy.spending_limits.confirmation_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };
        if is_high_risk_action {
            RiskLevel::aggregate([amount_tier, RiskLevel::Medium])
        } else {
            amount_tier
        }
    }
}
