//! Cross-module integration tests: a wallet's on-chain transaction
//! policy (`TransactionGuard`) and its x402 payment policy
//! (`PaymentMiddleware`) track spending independently, each through its
//! own public entry points, the way two unrelated agent capabilities
//! sharing one wallet actually would.

use rust_decimal_macros::dec;
use treasury_guard::{
    ChainPolicy, ChainType, GuardConfig, PaymentMiddleware, PaymentRequirements, SecurityProfile, TransactionDecision,
    TransactionGuard, TransactionRequest, X402Config,
};

const WALLET: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

#[test]
fn transaction_guard_and_payment_middleware_keep_separate_spending_windows() {
    let guard = TransactionGuard::new(ChainPolicy::for_mainnet(ChainType::Base, SecurityProfile::Standard), GuardConfig::default());
    let mw = PaymentMiddleware::new(X402Config::default());

    let tx = TransactionRequest::new(WALLET, "0x1234567890123456789012345678901234567890", "transfer", dec!(5));
    let result = guard.validate(&tx);
    assert_eq!(result.decision, TransactionDecision::Approve);
    guard.record_completed(WALLET, dec!(5));

    let payment = PaymentRequirements {
        network: "base".to_string(),
        max_amount_required_atomic: 500_000,
        resource: "/api/weather".to_string(),
        description: "weather lookup".to_string(),
        pay_to: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
        asset: "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string(),
    };
    mw.before("https://api.example.com/weather", &payment, WALLET).unwrap();
    mw.after(&payment, WALLET, true, Some("0xdeadbeef"), None);

    assert_eq!(guard.spending_summary(WALLET).hourly_spent, dec!(5));
    assert_eq!(mw.spending_summary(WALLET).hourly_spent, dec!(0.5));
}

#[test]
fn paranoid_profile_rejects_what_standard_would_approve() {
    let standard = TransactionGuard::new(ChainPolicy::for_mainnet(ChainType::Base, SecurityProfile::Standard), GuardConfig::default());
    let paranoid = TransactionGuard::new(ChainPolicy::for_mainnet(ChainType::Base, SecurityProfile::Paranoid), GuardConfig::default());

    let tx = TransactionRequest::new(WALLET, "0x1234567890123456789012345678901234567890", "transfer", dec!(20))
        .with_purpose("paying a vendor invoice");

    assert_eq!(standard.validate(&tx).decision, TransactionDecision::Approve);
    assert_ne!(paranoid.validate(&tx).decision, TransactionDecision::Approve);
}
