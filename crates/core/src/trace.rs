//! Evaluation trace and statistics types shared between the engine and the
//! HTTP layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Action, RuleDefinition, Severity};

// ── Comparison operators ─────────────────────────────────────────────

/// Comparison operator attached to a single evaluation step.
///
/// Serializes to the symbol the trace UI renders (`>`, `in`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    NotIn,
}

// ── Trace ────────────────────────────────────────────────────────────

/// One named condition instance inside a rule evaluation.
///
/// `threshold` is the effective (post-override) value the condition compared
/// against; `actual` is the observed value. Both are JSON values because a
/// threshold may be a number, a string set, or a rendered interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalStep {
    pub name: String,
    pub field: String,
    pub operator: CmpOp,
    pub threshold: Value,
    pub actual: Value,
    pub passed: bool,
}

/// Full evaluation trace for one (rule, transaction) pair.
///
/// `fired` is the AND of all step verdicts; a trace with zero steps is
/// not-fired by definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalTrace {
    pub rule_id: String,
    pub rule_name: String,
    pub transaction_id: String,
    pub fired: bool,
    pub steps: Vec<EvalStep>,
}

// ── Stats ────────────────────────────────────────────────────────────

/// Precomputed per-rule firing statistics under default parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub rule_id: String,
    pub rule_name: String,
    pub total_transactions: usize,
    pub fired_count: usize,
    pub not_fired_count: usize,
    /// fired / total, rounded to 4 decimals.
    pub fire_rate: f64,
    pub severity: Severity,
    pub action: Action,
}

/// Rule metadata joined with its precomputed stats, for the rule picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleWithStats {
    #[serde(flatten)]
    pub rule: RuleDefinition,
    #[serde(flatten)]
    pub stats: RuleStats,
}

// ── Tests ────────────────────────────────────────────────────────────
