//! The unified result type returned by every validator in the workspace.
//!
//! Replaces the family of ad-hoc result dicts returned by the various
//! `validate_*` methods in the pre-Rust implementation with a single sum
//! type parameterized by [`ValidationMode`]. Subsystem-specific detail
//! (spending summaries, query classifications) lives on sibling types and
//! is composed by reference rather than folded into `Verdict` itself.

use std::fmt;

/// Total ordering over risk severity. `Safe` is the bottom element;
/// `Critical` the top. Aggregating a multiset of risks is `max` under
/// this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// `max` over an iterator of risks, defaulting to `Safe` when empty.
    pub fn aggregate(levels: impl IntoIterator<Item = RiskLevel>) -> RiskLevel {
        levels.into_iter().max().unwrap_or(RiskLevel::Safe)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Which layer of the validation pipeline produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLayer {
    /// Neither layer ran (e.g. empty input short-circuit).
    None,
    /// Only the pattern-catalog gate engine ran.
    Heuristic,
    /// Only the semantic client ran.
    Semantic,
    /// Both layers contributed to the decision.
    Both,
}

/// What a [`Verdict`] was validating. `Input` and `Output` specialize the
/// generic path: "is this an attack?" vs "did the safety seed fail?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    Generic,
    Input,
    Output,
}

/// The four orthogonal THSP gates, in their fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Truth,
    Harm,
    Scope,
    Purpose,
}

impl Gate {
    /// Fixed evaluation order T, H, S, P.
    pub const ORDER: [Gate; 4] = [Gate::Truth, Gate::Harm, Gate::Scope, Gate::Purpose];
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gate::Truth => "truth",
            Gate::Harm => "harm",
            Gate::Scope => "scope",
            Gate::Purpose => "purpose",
        };
        f.write_str(s)
    }
}

/// The unified result of a validation call.
///
/// Invariant: `safe == (violations.is_empty() && error.is_none())`.
/// `risk == Critical` implies `!safe`. `mode == Input` implies
/// `failure_types` is empty; `mode == Output` implies `attack_types` is
/// empty. Construct via [`Verdict::allow`] / [`Verdict::deny`] /
/// [`Verdict::errored`] to keep these invariants by construction rather
/// than by convention.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Verdict {
    pub safe: bool,
    pub layer: ValidationLayer,
    pub mode: ValidationMode,
    pub risk: RiskLevel,
    pub violations: Vec<String>,
    pub attack_types: Vec<String>,
    pub failure_types: Vec<String>,
    pub gates_failed: Vec<Gate>,
    pub reasoning: Option<String>,
    pub blocked: bool,
    pub input_context: Option<String>,
    pub error: Option<String>,
    pub latency_ms: f64,
}

impl Verdict {
    /// A safe verdict for `mode`, optionally tagged with the layer that
    /// produced it (use `ValidationLayer::None` for the empty-input
    /// short circuit).
    pub fn allow(mode: ValidationMode, layer: ValidationLayer) -> Self {
        Verdict {
            safe: true,
            layer,
            mode,
            risk: RiskLevel::Safe,
            violations: Vec::new(),
            attack_types: Vec::new(),
            failure_types: Vec::new(),
            gates_failed: Vec::new(),
            reasoning: None,
            blocked: false,
            input_context: None,
            error: None,
            latency_ms: 0.0,
        }
    }

    /// A denied verdict carrying the violations and gate(s) that failed.
    pub fn deny(
        mode: ValidationMode,
        layer: ValidationLayer,
        risk: RiskLevel,
        violations: Vec<String>,
        gates_failed: Vec<Gate>,
    ) -> Self {
        Verdict {
            safe: false,
            layer,
            mode,
            risk,
            violations,
            attack_types: Vec::new(),
            failure_types: Vec::new(),
            gates_failed,
            reasoning: None,
            blocked: true,
            input_context: None,
            error: None,
            latency_ms: 0.0,
        }
    }

    /// A verdict representing a validation-machinery failure (timeout,
    /// provider error) rather than a content decision. Still `!safe`.
    pub fn errored(mode: ValidationMode, layer: ValidationLayer, message: impl Into<String>) -> Self {
        Verdict {
            safe: false,
            layer,
            mode,
            risk: RiskLevel::High,
            violations: Vec::new(),
            attack_types: Vec::new(),
            failure_types: Vec::new(),
            gates_failed: Vec::new(),
            reasoning: None,
            blocked: false,
            input_context: None,
            error: Some(message.into()),
            latency_ms: 0.0,
        }
    }

    pub fn with_latency_ms(mut self, latency_ms: f64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_input_context(mut self, context: impl Into<String>) -> Self {
        self.input_context = Some(context.into());
        self
    }

    pub fn with_attack_types(mut self, attack_types: Vec<String>) -> Self {
        self.attack_types = attack_types;
        self
    }

    pub fn with_failure_types(mut self, failure_types: Vec<String>) -> Self {
        self.failure_types = failure_types;
        self
    }

    /// The first gate to fail in fixed T,H,S,P order, or `None`.
    pub fn violated_gate(&self) -> Option<Gate> {
        Gate::ORDER.into_iter().find(|g| self.gates_failed.contains(g))
    }

    /// Merge a semantic-layer verdict into a heuristic one, widening risk
    /// and violations and promoting the layer tag.
    pub fn merge_semantic(mut self, other: &Verdict) -> Self {
        self.safe = self.safe && other.safe;
        self.risk = RiskLevel::aggregate([self.risk, other.risk]);
        self.violations.extend(other.violations.iter().cloned());
        self.gates_failed.extend(other.gates_failed.iter().cloned());
        self.gates_failed.sort_by_key(|g| Gate::ORDER.iter().position(|o| o == g).unwrap());
        self.gates_failed.dedup();
        self.blocked = self.blocked || other.blocked;
        self.layer = match self.layer {
            ValidationLayer::Heuristic => ValidationLayer::Both,
            ValidationLayer::None => other.layer,
            other_layer => other_layer,
        };
        if other.reasoning.is_some() {
            self.reasoning = other.reasoning.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_ordering_is_total() {
        assert!(RiskLevel::Safe < RiskLevel::Low);
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
    }

    #[test]
    fn aggregate_is_max() {
        let r = RiskLevel::aggregate([RiskLevel::Low, RiskLevel::Critical, RiskLevel::Medium]);
        assert_eq!(r, RiskLevel::Critical);
        assert_eq!(RiskLevel::aggregate([]), RiskLevel::Safe);
    }

    #[test]
    fn allow_satisfies_invariant() {
        let v = Verdict::allow(ValidationMode::Input, ValidationLayer::Heuristic);
        assert!(v.safe);
        assert!(v.violations.is_empty());
        assert!(v.error.is_none());
    }

    #[test]
    fn deny_satisfies_invariant() {
        let v = Verdict::deny(
            ValidationMode::Input,
            ValidationLayer::Heuristic,
            RiskLevel::High,
            vec!["jailbreak attempt".into()],
            vec![Gate::Scope],
        );
        assert!(!v.safe);
        assert_eq!(v.violated_gate(), Some(Gate::Scope));
    }

    #[test]
    fn violated_gate_respects_fixed_order() {
        let v = Verdict::deny(
            ValidationMode::Generic,
            ValidationLayer::Heuristic,
            RiskLevel::High,
            vec!["a".into(), "b".into()],
            vec![Gate::Purpose, Gate::Harm],
        );
        assert_eq!(v.violated_gate(), Some(Gate::Harm));
    }
}
