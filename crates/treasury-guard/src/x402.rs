//! x402 payment policy: four THSP gates specialized for machine-to-machine
//! HTTP payments, plus the orchestrator that aggregates them into one
//! decision.
//!
//! Grounded on `coinbase/x402/validators.py` (`TruthGateValidator`,
//! `HarmGateValidator`, `ScopeGateValidator`, `PurposeGateValidator`,
//! `THSPPaymentValidator`) and `coinbase/x402/types.py` for the result
//! shapes. Reuses [`policy_core::Gate`] rather than porting a parallel
//! `THSPGate` enum — the Python original already notes that type as
//! re-exported from its canonical THSP module, and this crate's
//! canonical THSP module is `policy_core`.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use policy_core::{AuditEntry, AuditLog, Blocked, Gate, RiskLevel};

use crate::tracker::SpendingTracker;

/// Networks this payment gate understands, from the x402 SDK's
/// supported-network list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentNetwork {
    Base,
    BaseSepolia,
    Avalanche,
    AvalancheFuji,
}

impl PaymentNetwork {
    pub fn chain_id(self) -> u64 {
        match self {
            PaymentNetwork::BaseSepolia => 84532,
            PaymentNetwork::Base => 8453,
            PaymentNetwork::AvalancheFuji => 43113,
            PaymentNetwork::Avalanche => 43114,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "base" => Some(PaymentNetwork::Base),
            "base-sepolia" => Some(PaymentNetwork::BaseSepolia),
            "avalanche" => Some(PaymentNetwork::Avalanche),
            "avalanche-fuji" => Some(PaymentNetwork::AvalancheFuji),
            _ => None,
        }
    }
}

/// Overall risk bucket for a payment, ordered `Safe < Caution < High <
/// Critical < Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentRiskLevel {
    Safe,
    Caution,
    High,
    Critical,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentDecision {
    Approve,
    RequireConfirmation,
    Reject,
    Block,
}

/// An x402 `PaymentRequirements` payload, trimmed to the fields this
/// gate actually inspects.
#[derive(Debug, Clone)]
pub struct PaymentRequirements {
    pub network: String,
    pub max_amount_required_atomic: u128,
    pub resource: String,
    pub description: String,
    pub pay_to: String,
    pub asset: String,
}

impl PaymentRequirements {
    /// `get_amount_float`: atomic units assumed to use stablecoin's
    /// typical 6 decimals.
    pub fn amount(&self) -> Decimal {
        Decimal::from(self.max_amount_required_atomic) / dec!(1_000_000)
    }
}

/// Outcome of one gate's evaluation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct GateResult {
    pub gate: Gate,
    pub passed: bool,
    pub reason: Option<String>,
    pub warnings: Vec<String>,
}

impl GateResult {
    fn from_issues(gate: Gate, issues: Vec<String>, warnings: Vec<String>) -> Self {
        let passed = issues.is_empty();
        let reason = if passed { None } else { Some(issues.join("; ")) };
        GateResult { gate, passed, reason, warnings }
    }
}

/// Spending history supplied by the caller for the Scope gate, mirroring
/// `context["daily_spending"]`/`context["hourly_transaction_count"]`.
#[derive(Debug, Clone, Default)]
pub struct SpendingContext {
    pub daily_spent: Decimal,
    pub daily_tx_count: u32,
    pub hourly_tx_count: u32,
}

/// Endpoint/recipient familiarity supplied by the caller for the
/// Purpose gate, mirroring `context["endpoint_history"]`/
/// `context["recipient_history"]`.
#[derive(Debug, Clone, Default)]
pub struct FamiliarityContext {
    pub endpoint_known: bool,
    pub recipient_known: bool,
}

/// Policy knobs, grounded on `SentinelX402Config`.
#[derive(Debug, Clone)]
pub struct X402Config {
    pub require_https: bool,
    pub allowed_networks: HashSet<PaymentNetwork>,
    pub blocked_addresses: HashSet<String>,
    pub blocked_endpoint_substrings: Vec<String>,
    pub max_single_payment: Decimal,
    pub max_daily_total: Decimal,
    pub max_transactions_per_day: u32,
    pub max_transactions_per_hour: u32,
    pub confirmation_amount_threshold: Decimal,
    pub allow_unknown_endpoints: bool,
    pub allow_unknown_recipients: bool,
    pub strict_mode: bool,
    /// Gate the Truth gate's asset-contract check; mirrors
    /// `SentinelX402Config.validation.verify_contract_addresses`.
    pub verify_contract_addresses: bool,
    /// Lower-cased known stablecoin contract addresses per network (the
    /// Rust port collapses the Python original's separate
    /// `KNOWN_USDC_CONTRACTS`/`KNOWN_USDT_CONTRACTS` tables into one set
    /// per network, since the Truth gate only ever asks "is this asset
    /// one of the known ones", never which stablecoin it is).
    pub known_contracts: HashMap<PaymentNetwork, HashSet<String>>,
}

/// `KNOWN_USDC_CONTRACTS`/`KNOWN_USDT_CONTRACTS` merged per network, all
/// lower-cased. Base and Base Sepolia addresses are USDC's official
/// Circle-deployed contracts; Avalanche/Fuji are USDC.e's.
fn default_known_contracts() -> HashMap<PaymentNetwork, HashSet<String>> {
    [
        (PaymentNetwork::Base, "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913"),
        (PaymentNetwork::BaseSepolia, "0x036cbd53842c5426634e7929541ec2318f3dcf7e"),
        (PaymentNetwork::Avalanche, "0xb97ef9ef8734c71904d8002f8b6bc66dd9c48a6e"),
        (PaymentNetwork::AvalancheFuji, "0x5425890298aed601595a70ab815c96711a31bc65"),
    ]
    .into_iter()
    .map(|(network, addr)| (network, HashSet::from([addr.to_string()])))
    .collect()
}

impl Default for X402Config {
    fn default() -> Self {
        X402Config {
            require_https: true,
            allowed_networks: [PaymentNetwork::Base, PaymentNetwork::BaseSepolia].into_iter().collect(),
            blocked_addresses: HashSet::new(),
            blocked_endpoint_substrings: Vec::new(),
            max_single_payment: dec!(10.0),
            max_daily_total: dec!(100.0),
            max_transactions_per_day: 50,
            max_transactions_per_hour: 10,
            confirmation_amount_threshold: dec!(1.0),
            allow_unknown_endpoints: true,
            allow_unknown_recipients: true,
            strict_mode: false,
            verify_contract_addresses: true,
            known_contracts: default_known_contracts(),
        }
    }
}

const SUSPICIOUS_URL_SUBSTRINGS: &[&str] = &["bit.ly", "tinyurl", "@", "xn--"];
const SUSPICIOUS_DESCRIPTION_TERMS: &[&str] =
    &["urgent", "immediate", "secret", "private key", "password", "seed phrase", "recovery"];

fn is_valid_evm_address(address: &str) -> bool {
    crate::address::is_valid_evm_address(address)
}

fn parse_url_host(endpoint: &str) -> Option<(String, String)> {
    let (scheme, rest) = endpoint.split_once("://")?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
    Some((scheme.to_string(), host.to_string()))
}

fn is_bare_ipv4(host: &str) -> bool {
    let host = host.split(':').next().unwrap_or(host);
    let parts: Vec<&str> = host.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| p.parse::<u8>().is_ok())
}

fn truth_gate(req: &PaymentRequirements, endpoint: &str, config: &X402Config) -> GateResult {
    let mut issues = Vec::new();

    match parse_url_host(endpoint) {
        None => issues.push("Invalid endpoint URL format".to_string()),
        Some((scheme, _)) if config.require_https && scheme != "https" => {
            issues.push(format!("Endpoint uses {scheme} instead of HTTPS"));
        }
        Some(_) => {}
    }

    let network = PaymentNetwork::parse(&req.network);
    match network {
        None => issues.push(format!("Unknown network: {}", req.network)),
        Some(network) if !config.allowed_networks.contains(&network) => {
            issues.push(format!("Network {} is not in allowed networks", req.network));
        }
        Some(_) => {}
    }

    if config.verify_contract_addresses && !req.asset.is_empty() {
        if let Some(network) = network {
            let asset_lower = req.asset.to_ascii_lowercase();
            let known = config.known_contracts.get(&network);
            if !known.is_some_and(|set| set.contains(&asset_lower)) {
                issues.push(format!("Unverified asset contract: {}", &asset_lower[..asset_lower.len().min(10)]));
            }
        }
    }

    let amount = req.amount();
    if amount < Decimal::ZERO {
        issues.push("Payment amount is negative".to_string());
    } else if amount == Decimal::ZERO {
        issues.push("Payment amount is zero".to_string());
    }

    if req.pay_to.is_empty() {
        issues.push("Missing payment recipient address".to_string());
    } else if !is_valid_evm_address(&req.pay_to) {
        issues.push("Invalid recipient address format".to_string());
    }

    GateResult::from_issues(Gate::Truth, issues, Vec::new())
}

fn harm_gate(req: &PaymentRequirements, endpoint: &str, config: &X402Config) -> GateResult {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    let pay_to = req.pay_to.to_ascii_lowercase();
    if config.blocked_addresses.iter().any(|a| a.to_ascii_lowercase() == pay_to) {
        issues.push("Recipient address is blocked".to_string());
    }

    let endpoint_lower = endpoint.to_ascii_lowercase();
    for blocked in &config.blocked_endpoint_substrings {
        if endpoint_lower.contains(&blocked.to_ascii_lowercase()) {
            issues.push(format!("Endpoint matches blocklist pattern: {blocked}"));
        }
    }

    if SUSPICIOUS_URL_SUBSTRINGS.iter().any(|s| endpoint_lower.contains(s)) {
        warnings.push("URL matches a suspicious pattern".to_string());
    }

    if let Some((_, host)) = parse_url_host(endpoint) {
        if is_bare_ipv4(&host) {
            warnings.push("Endpoint uses a direct IP address instead of a domain".to_string());
        }
    }

    GateResult::from_issues(Gate::Harm, issues, warnings)
}

fn scope_gate(req: &PaymentRequirements, config: &X402Config, spending: Option<&SpendingContext>) -> GateResult {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let amount = req.amount();

    if amount > config.max_single_payment {
        issues.push(format!("Amount {amount} exceeds single payment limit {}", config.max_single_payment));
    }

    if let Some(spending) = spending {
        let projected_daily = spending.daily_spent + amount;
        if projected_daily > config.max_daily_total {
            issues.push(format!("Payment would exceed daily limit: {projected_daily} > {}", config.max_daily_total));
        }

        if spending.daily_tx_count >= config.max_transactions_per_day {
            issues.push(format!("Daily transaction limit reached: {}", spending.daily_tx_count));
        } else if (spending.daily_tx_count as f64) >= (config.max_transactions_per_day as f64) * 0.8 {
            warnings.push("Approaching daily transaction limit".to_string());
        }

        if spending.hourly_tx_count >= config.max_transactions_per_hour {
            issues.push(format!("Hourly rate limit exceeded: {} transactions", spending.hourly_tx_count));
        } else if (spending.hourly_tx_count as f64) >= (config.max_transactions_per_hour as f64) * 0.8 {
            warnings.push("Approaching hourly rate limit".to_string());
        }
    }

    GateResult::from_issues(Gate::Scope, issues, warnings)
}

fn purpose_gate(req: &PaymentRequirements, config: &X402Config, familiarity: Option<&FamiliarityContext>) -> GateResult {
    let mut concerns = Vec::new();
    let mut flags = Vec::new();

    if let Some(familiarity) = familiarity {
        if !familiarity.endpoint_known && !config.allow_unknown_endpoints {
            concerns.push("Payment to unknown/unverified endpoint".to_string());
        }
        if !familiarity.recipient_known && !config.allow_unknown_recipients {
            concerns.push("Payment to unknown recipient address".to_string());
        } else if !familiarity.recipient_known {
            flags.push("First payment to this recipient".to_string());
        }
    }

    let description = req.description.to_ascii_lowercase();
    for term in SUSPICIOUS_DESCRIPTION_TERMS {
        if description.contains(term) {
            concerns.push(format!("Suspicious term in description: '{term}'"));
        }
    }

    if req.resource.is_empty() {
        flags.push("No resource specified for payment".to_string());
    }

    if config.strict_mode {
        concerns.extend(flags.drain(..));
    }

    GateResult::from_issues(Gate::Purpose, concerns, flags)
}

/// Result of running a payment through every THSP gate.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PaymentValidationResult {
    pub decision: PaymentDecision,
    pub risk_level: PaymentRiskLevel,
    pub gates: Vec<GateResult>,
}

impl PaymentValidationResult {
    pub fn is_approved(&self) -> bool {
        matches!(self.decision, PaymentDecision::Approve | PaymentDecision::RequireConfirmation)
    }

    pub fn all_gates_passed(&self) -> bool {
        self.gates.iter().all(|g| g.passed)
    }

    pub fn failed_gates(&self) -> Vec<Gate> {
        self.gates.iter().filter(|g| !g.passed).map(|g| g.gate).collect()
    }
}

/// Orchestrates the four gates and derives one decision, grounded on
/// `THSPPaymentValidator`.
#[derive(Debug, Clone, Default)]
pub struct ThspPaymentValidator;

impl ThspPaymentValidator {
    pub fn new() -> Self {
        ThspPaymentValidator
    }

    pub fn validate_payment(
        &self,
        req: &PaymentRequirements,
        endpoint: &str,
        config: &X402Config,
        spending: Option<&SpendingContext>,
        familiarity: Option<&FamiliarityContext>,
    ) -> PaymentValidationResult {
        // Truth, Harm, Scope, Purpose: Gate::ORDER fixes this sequence.
        let gates = vec![
            truth_gate(req, endpoint, config),
            harm_gate(req, endpoint, config),
            scope_gate(req, config, spending),
            purpose_gate(req, config, familiarity),
        ];

        let risk_level = self.calculate_risk_level(&gates, req, config);
        let decision = match risk_level {
            PaymentRiskLevel::Blocked => PaymentDecision::Block,
            PaymentRiskLevel::Critical => PaymentDecision::Reject,
            PaymentRiskLevel::High => PaymentDecision::Reject,
            PaymentRiskLevel::Caution => PaymentDecision::RequireConfirmation,
            PaymentRiskLevel::Safe => PaymentDecision::Approve,
        };

        PaymentValidationResult { decision, risk_level, gates }
    }

    fn calculate_risk_level(&self, gates: &[GateResult], req: &PaymentRequirements, config: &X402Config) -> PaymentRiskLevel {
        let failed: Vec<Gate> = gates.iter().filter(|g| !g.passed).map(|g| g.gate).collect();

        if failed.contains(&Gate::Harm) {
            return PaymentRiskLevel::Blocked;
        }
        if failed.len() >= 2 {
            return PaymentRiskLevel::Critical;
        }
        if failed.len() == 1 {
            return PaymentRiskLevel::High;
        }

        let has_warnings = gates.iter().any(|g| !g.warnings.is_empty());
        if req.amount() > config.confirmation_amount_threshold {
            return PaymentRiskLevel::Caution;
        }
        if has_warnings {
            return PaymentRiskLevel::Caution;
        }
        PaymentRiskLevel::Safe
    }
}

fn reason_text(result: &PaymentValidationResult) -> String {
    result.gates.iter().filter_map(|g| g.reason.clone()).collect::<Vec<_>>().join("; ")
}

/// The two lifecycle hooks an HTTP payment flow actually calls: `before`
/// a challenge is paid, `after` the payment resolves. Wraps
/// [`ThspPaymentValidator`] with the spending-window and
/// endpoint/recipient familiarity state a caller would otherwise have to
/// thread through by hand on every call.
///
/// A "strict" adapter: `before` converts anything short of outright
/// approval into an `Err(Blocked)` variant rather than returning a
/// verdict the caller has to branch on, mirroring
/// [`crate::guard::TransactionGuard`]'s non-strict style with the
/// polarity flipped, since x402 is an HTTP middleware seam where
/// exception-style control flow is the natural fit.
pub struct PaymentMiddleware {
    validator: ThspPaymentValidator,
    config: X402Config,
    tracker: SpendingTracker,
    known_endpoints: Mutex<HashSet<String>>,
    known_recipients: Mutex<HashSet<String>>,
    audit: AuditLog,
}

impl PaymentMiddleware {
    pub fn new(config: X402Config) -> Self {
        PaymentMiddleware {
            validator: ThspPaymentValidator::new(),
            config,
            tracker: SpendingTracker::new(),
            known_endpoints: Mutex::new(HashSet::new()),
            known_recipients: Mutex::new(HashSet::new()),
            audit: AuditLog::new(512),
        }
    }

    pub fn spending_summary(&self, wallet: &str) -> crate::tracker::SpendingSummary {
        self.tracker.summary(wallet)
    }

    pub fn recent_audit(&self, n: usize) -> Vec<AuditEntry> {
        self.audit.recent(n)
    }

    /// Runs the full gate pipeline ahead of a payment attempt, pulling
    /// spending history from the wallet's tracked windows and
    /// endpoint/recipient familiarity from prior `before` calls on this
    /// same middleware instance. Returns `Ok` only for
    /// [`PaymentDecision::Approve`]; every other decision comes back as
    /// the matching `Blocked` variant so a caller can `?` straight
    /// through to "payment sent" without inspecting a verdict first.
    pub fn before(&self, endpoint: &str, req: &PaymentRequirements, wallet: &str) -> Result<PaymentValidationResult, Blocked> {
        let summary = self.tracker.summary(wallet);
        let spending = SpendingContext {
            daily_spent: summary.daily_spent,
            daily_tx_count: summary.daily_tx_count,
            hourly_tx_count: summary.hourly_tx_count,
        };

        let recipient_key = req.pay_to.to_ascii_lowercase();
        let endpoint_known = self.known_endpoints.lock().contains(endpoint);
        let recipient_known = self.known_recipients.lock().contains(&recipient_key);
        let familiarity = FamiliarityContext { endpoint_known, recipient_known };

        let result = self.validator.validate_payment(req, endpoint, &self.config, Some(&spending), Some(&familiarity));

        self.known_endpoints.lock().insert(endpoint.to_string());
        self.known_recipients.lock().insert(recipient_key);

        match result.decision {
            PaymentDecision::Approve => Ok(result),
            PaymentDecision::RequireConfirmation => Err(Blocked::ConfirmationRequired { reason: reason_text(&result) }),
            PaymentDecision::Reject => Err(Blocked::PaymentRejected { reason: reason_text(&result) }),
            PaymentDecision::Block => Err(Blocked::Payment { reason: reason_text(&result) }),
        }
    }

    /// Records the outcome of a payment attempt `before` already cleared.
    /// Only a successful payment grows the wallet's spending windows — a
    /// failed or reverted attempt never counts against the sender's
    /// limits — but an audit entry is appended either way.
    pub fn after(&self, req: &PaymentRequirements, wallet: &str, success: bool, tx_hash: Option<&str>, error: Option<&str>) {
        if success {
            self.tracker.record_transaction(wallet, req.amount());
        }

        let decision = if success { "completed" } else { "failed" };
        let risk = if success { RiskLevel::Safe } else { RiskLevel::Medium };
        let mut concerns = Vec::new();
        if let Some(tx_hash) = tx_hash {
            concerns.push(format!("tx_hash: {tx_hash}"));
        }
        if let Some(error) = error {
            concerns.push(format!("error: {error}"));
        }

        self.audit.push(AuditEntry::new("x402_payment", decision, risk).with_concerns(concerns));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> PaymentRequirements {
        PaymentRequirements {
            network: "base".to_string(),
            max_amount_required_atomic: 500_000, // $0.50
            resource: "/api/weather".to_string(),
            description: "Hourly weather data".to_string(),
            pay_to: "0x742d35Cc6634C0532925a3b844Bc454e4438f44e".to_string(),
            asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
        }
    }

    #[test]
    fn well_formed_cheap_payment_is_approved() {
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&req(), "https://api.example.com/weather", &X402Config::default(), None, None);
        assert_eq!(result.decision, PaymentDecision::Approve);
        assert!(result.all_gates_passed());
    }

    #[test]
    fn blocked_recipient_is_blocked_outright() {
        let mut config = X402Config::default();
        config.blocked_addresses.insert(req().pay_to);
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&req(), "https://api.example.com/weather", &config, None, None);
        assert_eq!(result.decision, PaymentDecision::Block);
        assert_eq!(result.risk_level, PaymentRiskLevel::Blocked);
    }

    #[test]
    fn non_https_endpoint_fails_truth_gate() {
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&req(), "http://api.example.com/weather", &X402Config::default(), None, None);
        assert!(result.failed_gates().contains(&Gate::Truth));
    }

    #[test]
    fn unverified_asset_contract_fails_truth_gate() {
        let mut request = req();
        request.asset = "0x000000000000000000000000000000deadbeef".to_string();
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&request, "https://api.example.com/weather", &X402Config::default(), None, None);
        assert!(result.failed_gates().contains(&Gate::Truth));
    }

    #[test]
    fn asset_contract_check_is_skipped_when_disabled() {
        let mut request = req();
        request.asset = "0x000000000000000000000000000000deadbeef".to_string();
        let mut config = X402Config::default();
        config.verify_contract_addresses = false;
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&request, "https://api.example.com/weather", &config, None, None);
        assert!(!result.failed_gates().contains(&Gate::Truth));
    }

    #[test]
    fn amount_over_single_limit_fails_scope_gate() {
        let mut request = req();
        request.max_amount_required_atomic = 50_000_000; // $50
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&request, "https://api.example.com/weather", &X402Config::default(), None, None);
        assert!(result.failed_gates().contains(&Gate::Scope));
    }

    #[test]
    fn suspicious_description_fails_purpose_gate() {
        let mut request = req();
        request.description = "urgent: send your seed phrase".to_string();
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&request, "https://api.example.com/weather", &X402Config::default(), None, None);
        assert!(result.failed_gates().contains(&Gate::Purpose));
    }

    #[test]
    fn amount_above_confirmation_threshold_requires_confirmation() {
        let mut request = req();
        request.max_amount_required_atomic = 2_000_000; // $2, above $1 default threshold
        let validator = ThspPaymentValidator::new();
        let result = validator.validate_payment(&request, "https://api.example.com/weather", &X402Config::default(), None, None);
        assert_eq!(result.decision, PaymentDecision::RequireConfirmation);
    }

    #[test]
    fn daily_limit_breach_is_rejected() {
        let validator = ThspPaymentValidator::new();
        let spending = SpendingContext { daily_spent: dec!(99.6), daily_tx_count: 1, hourly_tx_count: 1 };
        let result =
            validator.validate_payment(&req(), "https://api.example.com/weather", &X402Config::default(), Some(&spending), None);
        assert!(result.failed_gates().contains(&Gate::Scope));
        assert_eq!(result.decision, PaymentDecision::Reject);
    }

    #[test]
    fn middleware_before_approves_cheap_well_formed_payment() {
        let mw = PaymentMiddleware::new(X402Config::default());
        let result = mw.before("https://api.example.com/weather", &req(), "0xsender").unwrap();
        assert_eq!(result.decision, PaymentDecision::Approve);
    }

    #[test]
    fn middleware_before_raises_blocked_for_blocked_recipient() {
        let mut config = X402Config::default();
        config.blocked_addresses.insert(req().pay_to);
        let mw = PaymentMiddleware::new(config);
        let err = mw.before("https://api.example.com/weather", &req(), "0xsender").unwrap_err();
        assert!(matches!(err, Blocked::Payment { .. }));
    }

    #[test]
    fn middleware_before_raises_confirmation_required_above_threshold() {
        let mw = PaymentMiddleware::new(X402Config::default());
        let mut request = req();
        request.max_amount_required_atomic = 2_000_000; // $2, above $1 default threshold
        let err = mw.before("https://api.example.com/weather", &request, "0xsender").unwrap_err();
        assert!(matches!(err, Blocked::ConfirmationRequired { .. }));
    }

    #[test]
    fn middleware_after_only_records_on_success() {
        let mw = PaymentMiddleware::new(X402Config::default());
        mw.after(&req(), "0xsender", false, None, Some("insufficient funds"));
        assert_eq!(mw.spending_summary("0xsender").hourly_tx_count, 0);

        mw.after(&req(), "0xsender", true, Some("0xdeadbeef"), None);
        assert_eq!(mw.spending_summary("0xsender").hourly_tx_count, 1);
        assert_eq!(mw.recent_audit(10).len(), 2);
    }

    #[test]
    fn middleware_tracks_recipient_familiarity_across_calls() {
        let mw = PaymentMiddleware::new(X402Config::default());
        let first = mw.before("https://api.example.com/weather", &req(), "0xsender").unwrap();
        let first_purpose = first.gates.iter().find(|g| g.gate == Gate::Purpose).unwrap();
        assert!(first_purpose.warnings.iter().any(|w| w.contains("First payment")));

        // second call to the same recipient no longer carries a "first payment" flag
        let second = mw.before("https://api.example.com/weather", &req(), "0xsender").unwrap();
        let second_purpose = second.gates.iter().find(|g| g.gate == Gate::Purpose).unwrap();
        assert!(!second_purpose.warnings.iter().any(|w| w.contains("First payment")));
    }
}
