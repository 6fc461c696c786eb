//! Chain identity, security profiles, and spending-limit presets.
//!
//! Grounded verbatim on `coinbase/config.py`'s `ChainType`, `RiskLevel`,
//! `SecurityProfile`, `SpendingLimits`, and `ChainConfig.for_mainnet`'s
//! `limits_map`. The numeric defaults below are copied exactly from that
//! file; they are business policy, not implementation detail, so
//! changing them changes behavior observable by every caller.

use std::collections::HashSet;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// EVM and SVM networks this guard understands. Each network maps to a
/// single native token and a testnet/mainnet classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainType {
    EthereumMainnet,
    EthereumSepolia,
    Base,
    BaseSepolia,
    Polygon,
    PolygonMumbai,
    Arbitrum,
    ArbitrumSepolia,
    Optimism,
    OptimismSepolia,
    Avalanche,
    AvalancheFuji,
    SolanaMainnet,
    SolanaDevnet,
}

impl ChainType {
    pub fn is_testnet(self) -> bool {
        matches!(
            self,
            ChainType::EthereumSepolia
                | ChainType::BaseSepolia
                | ChainType::PolygonMumbai
                | ChainType::ArbitrumSepolia
                | ChainType::OptimismSepolia
                | ChainType::AvalancheFuji
                | ChainType::SolanaDevnet
        )
    }

    pub fn is_evm(self) -> bool {
        !matches!(self, ChainType::SolanaMainnet | ChainType::SolanaDevnet)
    }

    pub fn native_token(self) -> &'static str {
        match self {
            ChainType::EthereumMainnet | ChainType::EthereumSepolia => "ETH",
            ChainType::Base | ChainType::BaseSepolia => "ETH",
            ChainType::Polygon | ChainType::PolygonMumbai => "MATIC",
            ChainType::Arbitrum | ChainType::ArbitrumSepolia => "ETH",
            ChainType::Optimism | ChainType::OptimismSepolia => "ETH",
            ChainType::Avalanche | ChainType::AvalancheFuji => "AVAX",
            ChainType::SolanaMainnet | ChainType::SolanaDevnet => "SOL",
        }
    }
}

/// How strict spending/approval enforcement should be by default. Maps
/// directly onto a [`SpendingLimits`] preset via
/// [`SpendingLimits::for_profile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityProfile {
    Permissive,
    Standard,
    Strict,
    Paranoid,
}

/// Per-wallet spending caps and confirmation thresholds. Immutable by
/// construction — use [`SpendingLimits::for_profile`] or
/// [`SpendingLimits::for_testnet`] rather than mutating fields after the
/// fact, mirroring the Python `frozen=True` dataclass.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpendingLimits {
    pub max_single_transaction: Decimal,
    pub max_daily_total: Decimal,
    pub max_hourly_total: Decimal,
    pub max_transactions_per_hour: u32,
    pub max_transactions_per_day: u32,
    pub confirmation_threshold: Decimal,
}

impl Default for SpendingLimits {
    fn default() -> Self {
        SpendingLimits::for_profile(SecurityProfile::Standard)
    }
}

impl SpendingLimits {
    /// The `STANDARD`/`STRICT`/etc. presets from `limits_map` in
    /// `ChainConfig.for_mainnet`.
    pub fn for_profile(profile: SecurityProfile) -> Self {
        match profile {
            SecurityProfile::Permissive => SpendingLimits {
                max_single_transaction: dec!(1000.0),
                max_daily_total: dec!(5000.0),
                max_hourly_total: dec!(2000.0),
                max_transactions_per_hour: 50,
                max_transactions_per_day: 200,
                confirmation_threshold: dec!(100.0),
            },
            SecurityProfile::Standard => SpendingLimits {
                max_single_transaction: dec!(100.0),
                max_daily_total: dec!(500.0),
                max_hourly_total: dec!(200.0),
                max_transactions_per_hour: 10,
                max_transactions_per_day: 50,
                confirmation_threshold: dec!(25.0),
            },
            SecurityProfile::Strict => SpendingLimits {
                max_single_transaction: dec!(25.0),
                max_daily_total: dec!(100.0),
                max_hourly_total: dec!(50.0),
                max_transactions_per_hour: 5,
                max_transactions_per_day: 20,
                confirmation_threshold: dec!(10.0),
            },
            SecurityProfile::Paranoid => SpendingLimits {
                max_single_transaction: dec!(10.0),
                max_daily_total: dec!(50.0),
                max_hourly_total: dec!(25.0),
                max_transactions_per_hour: 3,
                max_transactions_per_day: 10,
                confirmation_threshold: dec!(5.0),
            },
        }
    }

    /// Testnet limits are relaxed relative to mainnet (no real value at
    /// risk): 10x the transaction/daily/hourly ceilings, 100x the
    /// per-period transaction counts.
    pub fn for_testnet(profile: SecurityProfile) -> Self {
        let base = SpendingLimits::for_profile(profile);
        SpendingLimits {
            max_single_transaction: base.max_single_transaction * dec!(10),
            max_daily_total: base.max_daily_total * dec!(10),
            max_hourly_total: base.max_hourly_total * dec!(10),
            max_transactions_per_hour: base.max_transactions_per_hour * 100,
            max_transactions_per_day: base.max_transactions_per_day * 100,
            confirmation_threshold: base.confirmation_threshold * dec!(10),
        }
    }

    pub fn exceeds_single(&self, amount: Decimal) -> bool {
        amount > self.max_single_transaction
    }

    pub fn requires_confirmation(&self, amount: Decimal) -> bool {
        amount >= self.confirmation_threshold
    }
}

/// Per-chain policy: which [`SpendingLimits`] apply, contract
/// allow/blocklists, and gas-price ceiling.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChainPolicy {
    pub chain_type: ChainType,
    pub spending_limits: SpendingLimits,
    pub blocked_contracts: HashSet<String>,
    pub allowed_contracts: Option<HashSet<String>>,
    pub max_gas_price_gwei: u64,
    pub require_verified_contracts: bool,
}

impl ChainPolicy {
    pub fn for_mainnet(chain_type: ChainType, profile: SecurityProfile) -> Self {
        ChainPolicy {
            chain_type,
            spending_limits: SpendingLimits::for_profile(profile),
            blocked_contracts: HashSet::new(),
            allowed_contracts: None,
            max_gas_price_gwei: 500,
            require_verified_contracts: matches!(profile, SecurityProfile::Strict | SecurityProfile::Paranoid),
        }
    }

    pub fn for_testnet(chain_type: ChainType, profile: SecurityProfile) -> Self {
        ChainPolicy {
            chain_type,
            spending_limits: SpendingLimits::for_testnet(profile),
            blocked_contracts: HashSet::new(),
            allowed_contracts: None,
            max_gas_price_gwei: 5000,
            require_verified_contracts: false,
        }
    }

    /// Convenience constructor dispatching on [`ChainType::is_testnet`].
    pub fn for_chain(chain_type: ChainType, profile: SecurityProfile) -> Self {
        if chain_type.is_testnet() {
            ChainPolicy::for_testnet(chain_type, profile)
        } else {
            ChainPolicy::for_mainnet(chain_type, profile)
        }
    }
}

/// Actions considered high-risk enough to require a stated purpose
/// (`TransactionGuard` step 7) even when within spending limits.
pub const HIGH_RISK_ACTIONS: &[&str] =
    &["approve", "transfer_ownership", "set_approval_for_all", "delegate", "upgrade", "self_destruct", "renounce_ownership"];

/// Actions that never need extra scrutiny beyond the standard checks.
pub const SAFE_ACTIONS: &[&str] = &["balance_of", "get_balance", "read", "view", "simulate", "estimate_gas"];

/// Actions blocked unconditionally regardless of spending limits.
pub const BLOCKED_ACTIONS: &[&str] = &["self_destruct", "renounce_ownership"];

pub fn is_high_risk_action(action: &str) -> bool {
    HIGH_RISK_ACTIONS.contains(&action)
}

pub fn is_safe_action(action: &str) -> bool {
    SAFE_ACTIONS.contains(&action)
}

pub fn is_blocked_action(action: &str) -> bool {
    BLOCKED_ACTIONS.contains(&action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_limits_relax_mainnet_by_the_documented_factors() {
        let mainnet = SpendingLimits::for_profile(SecurityProfile::Standard);
        let testnet = SpendingLimits::for_testnet(SecurityProfile::Standard);
        assert_eq!(testnet.max_single_transaction, mainnet.max_single_transaction * dec!(10));
        assert_eq!(testnet.max_transactions_per_hour, mainnet.max_transactions_per_hour * 100);
    }

    #[test]
    fn paranoid_is_strictly_tighter_than_permissive() {
        let paranoid = SpendingLimits::for_profile(SecurityProfile::Paranoid);
        let permissive = SpendingLimits::for_profile(SecurityProfile::Permissive);
        assert!(paranoid.max_single_transaction < permissive.max_single_transaction);
        assert!(paranoid.max_transactions_per_day < permissive.max_transactions_per_day);
    }

    #[test]
    fn chain_for_chain_picks_testnet_limits_for_testnet_chains() {
        let policy = ChainPolicy::for_chain(ChainType::BaseSepolia, SecurityProfile::Standard);
        assert_eq!(policy.spending_limits, SpendingLimits::for_testnet(SecurityProfile::Standard));
    }

    #[test]
    fn action_classification() {
        assert!(is_high_risk_action("approve"));
        assert!(is_safe_action("balance_of"));
        assert!(is_blocked_action("self_destruct"));
        assert!(!is_high_risk_action("balance_of"));
    }
}
