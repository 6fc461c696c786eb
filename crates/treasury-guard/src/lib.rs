#![warn(unused)]
#![warn(dead_code)]
//! On-chain transaction and x402 payment policy: address validation,
//! windowed spending limits, unlimited-approval detection, DeFi risk
//! scoring, and HTTP-native payment-challenge gates.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        treasury-guard                         │
//! ├───────────────────────────────────────────────────────────────┤
//! │  address   EIP-55 checksum validation                         │
//! │  chain     ChainPolicy / SpendingLimits / security profiles    │
//! │  tracker   SpendingTracker (hourly/daily windows per wallet)   │
//! │  guard     TransactionGuard (9-step decision algorithm)        │
//! │  defi      DeFiRiskAssessment scoring                          │
//! │  x402      Truth/Harm/Scope/Purpose payment-challenge gates    │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! `TransactionGuard` is a policy decision point, not a ledger: it
//! decides approve/reject/block for a proposed action and records
//! completed spend into its `SpendingTracker`, but never moves funds or
//! holds a balance itself.

pub mod address;
pub mod chain;
pub mod defi;
pub mod guard;
pub mod tracker;
pub mod x402;

pub use address::{validate_address, AddressValidationResult, AddressValidationStatus};
pub use chain::{ChainPolicy, ChainType, SecurityProfile, SpendingLimits};
pub use defi::{DeFiActionType, DeFiInteraction, DeFiProtocol, DeFiRiskAssessment, DeFiValidator};
pub use guard::{GuardConfig, GuardStats, TransactionDecision, TransactionGuard, TransactionRequest, TransactionValidationResult};
pub use tracker::{SpendingSummary, SpendingTracker};
pub use x402::{
    FamiliarityContext, PaymentDecision, PaymentMiddleware, PaymentNetwork, PaymentRequirements, PaymentRiskLevel,
    PaymentValidationResult, SpendingContext, ThspPaymentValidator, X402Config,
};
