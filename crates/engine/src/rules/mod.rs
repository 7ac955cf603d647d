//! Rule registry: declarative metadata bound to pure evaluator kinds.
//!
//! The seven reference rules are an explicit sum type rather than a dynamic
//! dispatch table; each kind carries its typed default-parameter schema and
//! a pure step builder. Evaluators follow one shared policy: a rule fires
//! iff every emitted step passed, and a rule whose required input is absent
//! for a transaction emits zero steps (not-fired, never an error), so the
//! trace is always renderable.

pub mod params;

use std::collections::HashMap;

use serde_json::{json, Value};

use ruletrace_core::{CmpOp, EngineError, EvalStep, FeatureVector, RuleDefinition, Transaction};

use crate::profile::SenderProfile;
use params::{ParamValue, Params};

/// Round to 2 decimals (data-driven default thresholds).
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round to 4 decimals (frequencies and fire rates).
pub(crate) fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

// ── Evaluation input ─────────────────────────────────────────────────

/// Everything a rule may look at for one transaction.
///
/// `feature` and `profile` are optional: their absence is a data condition
/// the evaluators handle, not an error.
#[derive(Debug, Clone, Copy)]
pub struct EvalInput<'a> {
    pub txn: &'a Transaction,
    pub feature: Option<&'a FeatureVector>,
    pub profile: Option<&'a SenderProfile>,
}

// ── Rule kinds ───────────────────────────────────────────────────────

/// The seven built-in rule evaluators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// Single large amount.
    HighValue,
    /// Many historical transactions with a small average amount.
    StructuredSmall,
    /// Transaction type the sender rarely uses.
    UnusualType,
    /// Merchant country in a configured high-risk set.
    HighRiskCountry,
    /// Merchant country differs from the sender's modal country, with a
    /// significant amount.
    CrossBorder,
    /// Hour of day outside the configured [start, end) window.
    OutsideHours,
    /// Cash-like transaction type with a large amount.
    CashLike,
}

impl RuleKind {
    /// Map a declaration id to its bound evaluator kind.
    pub fn from_rule_id(rule_id: &str) -> Option<Self> {
        match rule_id {
            "RULE_001" => Some(RuleKind::HighValue),
            "RULE_002" => Some(RuleKind::StructuredSmall),
            "RULE_003" => Some(RuleKind::UnusualType),
            "RULE_004" => Some(RuleKind::HighRiskCountry),
            "RULE_005" => Some(RuleKind::CrossBorder),
            "RULE_006" => Some(RuleKind::OutsideHours),
            "RULE_007" => Some(RuleKind::CashLike),
            _ => None,
        }
    }

    /// Default parameters for this kind. Amount thresholds are seeded from
    /// the dataset's p50/p95 amounts so defaults track the data they debug.
    pub fn default_params(&self, amount_p50: f64, amount_p95: f64) -> Params {
        let mut p = Params::new();
        match self {
            RuleKind::HighValue => {
                p.insert(
                    "amount_threshold".to_string(),
                    ParamValue::Number(round2(amount_p95)),
                );
            }
            RuleKind::StructuredSmall => {
                p.insert("count_threshold".to_string(), ParamValue::Int(5));
                p.insert(
                    "small_amount_threshold".to_string(),
                    ParamValue::Number(round2(amount_p50)),
                );
            }
            RuleKind::UnusualType => {
                p.insert(
                    "rare_type_freq_threshold".to_string(),
                    ParamValue::Number(0.10),
                );
            }
            RuleKind::HighRiskCountry => {
                p.insert(
                    "high_risk_countries".to_string(),
                    ParamValue::StringSet(
                        ["PRK", "IRN", "SYR", "CUB", "VEN", "MMR", "AFG", "YEM", "LBY", "SOM"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    ),
                );
            }
            RuleKind::CrossBorder => {
                p.insert(
                    "cross_border_amount_threshold".to_string(),
                    ParamValue::Number(round2(amount_p50)),
                );
            }
            RuleKind::OutsideHours => {
                p.insert("start_hour".to_string(), ParamValue::Int(8));
                p.insert("end_hour".to_string(), ParamValue::Int(22));
            }
            RuleKind::CashLike => {
                p.insert(
                    "cash_like_types".to_string(),
                    ParamValue::StringSet(vec!["chip_and_pin".to_string()]),
                );
                p.insert(
                    "cash_amount_threshold".to_string(),
                    ParamValue::Number(200.0),
                );
            }
        }
        p
    }

    /// Produce the ordered evaluation steps for one transaction.
    ///
    /// Pure: same input and effective parameters always yield the same
    /// steps. The caller derives the verdict as the AND of `passed` flags.
    pub fn evaluate(&self, input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
        match self {
            RuleKind::HighValue => eval_high_value(input, params),
            RuleKind::StructuredSmall => eval_structured_small(input, params),
            RuleKind::UnusualType => eval_unusual_type(input, params),
            RuleKind::HighRiskCountry => eval_high_risk_country(input, params),
            RuleKind::CrossBorder => eval_cross_border(input, params),
            RuleKind::OutsideHours => eval_outside_hours(input, params),
            RuleKind::CashLike => eval_cash_like(input, params),
        }
    }
}

/// Shared verdict policy across all rules: every emitted step must pass,
/// and zero steps means the rule did not apply (not fired).
pub fn verdict(steps: &[EvalStep]) -> bool {
    !steps.is_empty() && steps.iter().all(|s| s.passed)
}

// ── Step builders ────────────────────────────────────────────────────

fn step(
    name: &str,
    field: &str,
    operator: CmpOp,
    threshold: Value,
    actual: Value,
    passed: bool,
) -> EvalStep {
    EvalStep {
        name: name.to_string(),
        field: field.to_string(),
        operator,
        threshold,
        actual,
        passed,
    }
}

fn num(params: &Params, key: &str) -> f64 {
    params.get(key).and_then(ParamValue::as_f64).unwrap_or(0.0)
}

fn int(params: &Params, key: &str) -> i64 {
    num(params, key) as i64
}

fn set<'a>(params: &'a Params, key: &str) -> &'a [String] {
    params.get(key).and_then(ParamValue::as_set).unwrap_or(&[])
}

fn eval_high_value(input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
    let threshold = num(params, "amount_threshold");
    let amount = input.txn.amount;
    vec![step(
        "Amount exceeds threshold",
        "amount",
        CmpOp::Gt,
        json!(threshold),
        json!(amount),
        amount > threshold,
    )]
}

fn eval_structured_small(input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
    let Some(feature) = input.feature else {
        return Vec::new();
    };
    let count_threshold = int(params, "count_threshold");
    let small_threshold = num(params, "small_amount_threshold");
    vec![
        step(
            "Transaction count for sender >= threshold",
            "feature.transaction_count",
            CmpOp::Gte,
            json!(count_threshold),
            json!(feature.transaction_count),
            feature.transaction_count as i64 >= count_threshold,
        ),
        step(
            "Avg transaction amount is small",
            "feature.avg_transaction_amount",
            CmpOp::Lte,
            json!(small_threshold),
            json!(feature.avg_transaction_amount),
            feature.avg_transaction_amount <= small_threshold,
        ),
    ]
}

fn eval_unusual_type(input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
    let threshold = num(params, "rare_type_freq_threshold");
    let freq = input
        .profile
        .map(|p| p.type_frequency(&input.txn.transaction_type))
        .unwrap_or(0.0);
    vec![step(
        "Transaction type is rare for this sender",
        "sender_type_frequency",
        CmpOp::Lt,
        json!(threshold),
        json!(round4(freq)),
        freq < threshold,
    )]
}

fn eval_high_risk_country(input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
    let high_risk = set(params, "high_risk_countries");
    let country = input.txn.merchant_country.as_deref();
    let passed = country.is_some_and(|c| high_risk.iter().any(|h| h == c));
    vec![step(
        "Merchant country is high-risk",
        "merchant_country",
        CmpOp::In,
        json!(high_risk),
        json!(country),
        passed,
    )]
}

fn eval_cross_border(input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
    let modal = input.profile.and_then(|p| p.modal_country.as_deref());
    let country = input.txn.merchant_country.as_deref();
    let is_cross = matches!((country, modal), (Some(c), Some(m)) if c != m);

    let threshold = num(params, "cross_border_amount_threshold");
    let amount = input.txn.amount;
    vec![
        step(
            "Merchant country differs from sender's modal country",
            "merchant_country vs sender_modal_country",
            CmpOp::Ne,
            json!(modal),
            json!(country),
            is_cross,
        ),
        step(
            "Amount is significant for cross-border",
            "amount",
            CmpOp::Gte,
            json!(threshold),
            json!(amount),
            amount >= threshold,
        ),
    ]
}

fn eval_outside_hours(input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
    let Some(feature) = input.feature else {
        return Vec::new();
    };
    let start = int(params, "start_hour");
    let end = int(params, "end_hour");
    let hour = feature.hour_of_day as i64;
    let outside = hour < start || hour >= end;
    vec![step(
        "Transaction outside normal hours",
        "feature.hour_of_day",
        CmpOp::NotIn,
        json!(format!("[{start}, {end})")),
        json!(hour),
        outside,
    )]
}

fn eval_cash_like(input: &EvalInput<'_>, params: &Params) -> Vec<EvalStep> {
    let cash_types = set(params, "cash_like_types");
    let txn_type = &input.txn.transaction_type;
    let threshold = num(params, "cash_amount_threshold");
    let amount = input.txn.amount;
    vec![
        step(
            "Transaction type is cash-like",
            "transaction_type",
            CmpOp::In,
            json!(cash_types),
            json!(txn_type),
            cash_types.iter().any(|t| t == txn_type),
        ),
        step(
            "Amount exceeds cash withdrawal threshold",
            "amount",
            CmpOp::Gte,
            json!(threshold),
            json!(amount),
            amount >= threshold,
        ),
    ]
}

// ── Registry ─────────────────────────────────────────────────────────

/// One declared rule bound to its evaluator kind and default parameters.
#[derive(Debug, Clone)]
pub struct RuleBinding {
    pub definition: RuleDefinition,
    pub kind: RuleKind,
    pub defaults: Params,
}

/// All declared rules, each bound to an evaluator. Built once at startup.
#[derive(Debug)]
pub struct RuleRegistry {
    bindings: Vec<RuleBinding>,
    by_id: HashMap<String, usize>,
}

impl RuleRegistry {
    /// Bind every declaration to its kind. A declaration without a bound
    /// evaluator is a fatal load error, as is a duplicate rule id.
    pub fn build(
        rules: &[RuleDefinition],
        amount_p50: f64,
        amount_p95: f64,
    ) -> Result<Self, EngineError> {
        let mut bindings = Vec::with_capacity(rules.len());
        let mut by_id = HashMap::with_capacity(rules.len());

        for def in rules {
            let kind = RuleKind::from_rule_id(&def.rule_id).ok_or_else(|| {
                EngineError::DataLoad(format!("no evaluator bound to rule {}", def.rule_id))
            })?;
            if by_id.insert(def.rule_id.clone(), bindings.len()).is_some() {
                return Err(EngineError::DataLoad(format!(
                    "duplicate rule declaration: {}",
                    def.rule_id
                )));
            }
            bindings.push(RuleBinding {
                definition: def.clone(),
                kind,
                defaults: kind.default_params(amount_p50, amount_p95),
            });
        }

        Ok(Self { bindings, by_id })
    }

    pub fn get(&self, rule_id: &str) -> Option<&RuleBinding> {
        self.by_id.get(rule_id).map(|&i| &self.bindings[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuleBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
