//! DeFi protocol interaction risk scoring.
//!
//! Ported verbatim from `coinbase/validators/defi.py`, point values and
//! all. That module carries a prominent "KNOWN LIMITATION" disclaimer
//! about these scores being heuristic rather than empirically derived;
//! the same caveat applies here — see [`DeFiRiskAssessment`]'s doc
//! comment rather than re-deriving the thresholds.

use policy_core::RiskLevel;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeFiProtocol {
    Compound,
    Aave,
    Morpho,
    Superfluid,
    Uniswap,
    Wow,
    Unknown,
}

impl DeFiProtocol {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "compound" => DeFiProtocol::Compound,
            "aave" => DeFiProtocol::Aave,
            "morpho" => DeFiProtocol::Morpho,
            "superfluid" => DeFiProtocol::Superfluid,
            "uniswap" => DeFiProtocol::Uniswap,
            "wow" => DeFiProtocol::Wow,
            _ => DeFiProtocol::Unknown,
        }
    }

    /// Base risk weight (pre action-type multiplier), from
    /// `_get_protocol_risk`.
    fn base_risk(self) -> Decimal {
        match self {
            DeFiProtocol::Compound | DeFiProtocol::Aave | DeFiProtocol::Uniswap => dec!(2.0),
            DeFiProtocol::Morpho | DeFiProtocol::Superfluid => dec!(2.5),
            DeFiProtocol::Wow => dec!(3.5),
            DeFiProtocol::Unknown => dec!(4.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeFiActionType {
    Supply,
    Withdraw,
    Borrow,
    Repay,
    Swap,
    Trade,
    AddLiquidity,
    RemoveLiquidity,
    CreateToken,
    BuyToken,
    SellToken,
    CreateFlow,
    DeleteFlow,
    GetPortfolio,
    GetFlow,
    Other,
}

impl DeFiActionType {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "supply" => DeFiActionType::Supply,
            "withdraw" => DeFiActionType::Withdraw,
            "borrow" => DeFiActionType::Borrow,
            "repay" => DeFiActionType::Repay,
            "swap" => DeFiActionType::Swap,
            "trade" => DeFiActionType::Trade,
            "add_liquidity" => DeFiActionType::AddLiquidity,
            "remove_liquidity" => DeFiActionType::RemoveLiquidity,
            "create_token" => DeFiActionType::CreateToken,
            "buy_token" => DeFiActionType::BuyToken,
            "sell_token" => DeFiActionType::SellToken,
            "create_flow" => DeFiActionType::CreateFlow,
            "delete_flow" => DeFiActionType::DeleteFlow,
            "get_portfolio" => DeFiActionType::GetPortfolio,
            "get_flow" => DeFiActionType::GetFlow,
            _ => DeFiActionType::Other,
        }
    }

    /// `ACTION_RISK_WEIGHTS`.
    fn risk_weight(self) -> Decimal {
        match self {
            DeFiActionType::Borrow => dec!(1.5),
            DeFiActionType::AddLiquidity => dec!(1.3),
            DeFiActionType::CreateToken => dec!(1.4),
            DeFiActionType::CreateFlow => dec!(1.2),
            DeFiActionType::Supply | DeFiActionType::Swap | DeFiActionType::Trade => dec!(1.0),
            DeFiActionType::BuyToken | DeFiActionType::SellToken => dec!(1.1),
            DeFiActionType::Withdraw | DeFiActionType::Repay => dec!(0.8),
            DeFiActionType::RemoveLiquidity => dec!(0.9),
            DeFiActionType::DeleteFlow => dec!(0.7),
            DeFiActionType::GetPortfolio | DeFiActionType::GetFlow => dec!(0.0),
            DeFiActionType::Other => dec!(0.5),
        }
    }
}

/// Inputs describing a single DeFi interaction, threaded into
/// [`DeFiValidator::assess`].
#[derive(Debug, Clone, Default)]
pub struct DeFiInteraction {
    pub amount: Option<Decimal>,
    pub collateral_ratio: Option<Decimal>,
    pub apy: Option<Decimal>,
}

/// Result of scoring one DeFi interaction.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeFiRiskAssessment {
    pub protocol: DeFiProtocol,
    pub action: DeFiActionType,
    /// A 0-100 heuristic risk score. Not a calibrated probability —
    /// see this module's doc comment.
    pub risk_score: Decimal,
    pub risk_level: RiskLevel,
    pub concerns: Vec<String>,
}

/// Minimum safe collateralization ratio for a borrow, below the
/// outright-dangerous threshold of `1.0` (undercollateralized).
const DEFAULT_MIN_SAFE_COLLATERAL_RATIO: Decimal = dec!(1.5);

pub struct DeFiValidator {
    min_safe_collateral_ratio: Decimal,
    warn_on_new_protocols: bool,
}

impl Default for DeFiValidator {
    fn default() -> Self {
        DeFiValidator { min_safe_collateral_ratio: DEFAULT_MIN_SAFE_COLLATERAL_RATIO, warn_on_new_protocols: true }
    }
}

impl DeFiValidator {
    pub fn new(min_safe_collateral_ratio: Decimal, warn_on_new_protocols: bool) -> Self {
        DeFiValidator { min_safe_collateral_ratio, warn_on_new_protocols }
    }

    /// Scores one interaction. `protocol_name`/`action_name` are
    /// free-form strings from the caller (tool args, request payload)
    /// and parsed defensively — an unrecognized value becomes
    /// [`DeFiProtocol::Unknown`] / [`DeFiActionType::Other`] rather than
    /// an error.
    pub fn assess(&self, protocol_name: &str, action_name: &str, interaction: &DeFiInteraction) -> DeFiRiskAssessment {
        let protocol = DeFiProtocol::parse(protocol_name);
        let action = DeFiActionType::parse(action_name);
        let mut concerns = Vec::new();

        let mut score = protocol.base_risk() * dec!(25) * action.risk_weight();

        if let Some(amount) = interaction.amount {
            if amount > dec!(10000) {
                score += dec!(30);
                concerns.push("Large transaction amount (>$10,000)".to_string());
            } else if amount > dec!(1000) {
                score += dec!(15);
                concerns.push("Moderate transaction amount (>$1,000)".to_string());
            }
        }

        if action == DeFiActionType::Borrow {
            match interaction.collateral_ratio {
                Some(ratio) if ratio < dec!(1.0) => {
                    score += dec!(50);
                    concerns.push("Undercollateralized position (ratio < 1.0)".to_string());
                }
                Some(ratio) if ratio < self.min_safe_collateral_ratio => {
                    score += dec!(30);
                    concerns.push(format!("Collateral ratio below recommended minimum ({})", self.min_safe_collateral_ratio));
                }
                None => {
                    score += dec!(20);
                    concerns.push("No collateral ratio provided for borrow".to_string());
                }
                _ => {}
            }
        }

        if let Some(apy) = interaction.apy {
            if apy >= dec!(100) {
                score += dec!(40);
                concerns.push("Extremely high APY (>=100%) — likely unsustainable".to_string());
            } else if apy >= dec!(50) {
                score += dec!(20);
                concerns.push("High APY (>=50%)".to_string());
            }
        }

        match protocol {
            DeFiProtocol::Wow => {
                score += dec!(25);
                concerns.push("Wow.xyz bonding-curve tokens carry elevated rug risk".to_string());
            }
            DeFiProtocol::Superfluid if action == DeFiActionType::CreateFlow => {
                concerns.push("Superfluid streams continue until explicitly deleted".to_string());
            }
            DeFiProtocol::Morpho => {
                concerns.push("Morpho vault risk depends on the underlying market curator".to_string());
            }
            _ => {}
        }

        if protocol == DeFiProtocol::Unknown && self.warn_on_new_protocols {
            score += dec!(30);
            concerns.push("Unrecognized protocol — no risk history available".to_string());
        }

        let risk_score = score.clamp(dec!(0), dec!(100));
        DeFiRiskAssessment { protocol, action, risk_score, risk_level: score_to_level(risk_score), concerns }
    }
}

fn score_to_level(score: Decimal) -> RiskLevel {
    if score >= dec!(75) {
        RiskLevel::Critical
    } else if score >= dec!(50) {
        RiskLevel::High
    } else if score >= dec!(25) {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_supply_on_known_protocol_is_low_risk() {
        let validator = DeFiValidator::default();
        let assessment = validator.assess("aave", "supply", &DeFiInteraction::default());
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    #[test]
    fn unknown_protocol_is_penalized() {
        let validator = DeFiValidator::default();
        let assessment = validator.assess("mystery-protocol", "swap", &DeFiInteraction::default());
        assert!(assessment.concerns.iter().any(|c| c.contains("Unrecognized protocol")));
    }

    #[test]
    fn undercollateralized_borrow_is_flagged_critical() {
        let validator = DeFiValidator::default();
        let interaction = DeFiInteraction { collateral_ratio: Some(dec!(0.8)), ..Default::default() };
        let assessment = validator.assess("aave", "borrow", &interaction);
        assert!(assessment.concerns.iter().any(|c| c.contains("Undercollateralized")));
        assert_eq!(assessment.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn wow_protocol_adds_rug_risk_concern() {
        let validator = DeFiValidator::default();
        let assessment = validator.assess("wow", "buy_token", &DeFiInteraction::default());
        assert!(assessment.concerns.iter().any(|c| c.contains("rug risk")));
    }

    #[test]
    fn large_amount_escalates_score() {
        let validator = DeFiValidator::default();
        let small = validator.assess("aave", "supply", &DeFiInteraction { amount: Some(dec!(10)), ..Default::default() });
        let large = validator.assess("aave", "supply", &DeFiInteraction { amount: Some(dec!(50000)), ..Default::default() });
        assert!(large.risk_score > small.risk_score);
    }
}
