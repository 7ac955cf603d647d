//! Trace orchestration: look up the records a rule needs, merge overrides,
//! run the bound evaluator and wrap the result.
//!
//! Pure and side-effect free — safe to call concurrently and repeatedly
//! with different overrides for the same transaction.

use std::collections::HashMap;

use serde_json::Value;

use ruletrace_core::{EngineError, EvalTrace};

use crate::index::Indexes;
use crate::profile::SenderProfile;
use crate::rules::params::merge_overrides;
use crate::rules::{verdict, EvalInput, RuleRegistry};
use crate::store::RecordStore;

/// Evaluate one rule against one transaction, with optional parameter
/// overrides merged onto the rule's defaults.
pub fn evaluate(
    registry: &RuleRegistry,
    store: &RecordStore,
    indexes: &Indexes,
    profiles: &HashMap<String, SenderProfile>,
    rule_id: &str,
    transaction_id: &str,
    overrides: Option<&serde_json::Map<String, Value>>,
) -> Result<EvalTrace, EngineError> {
    let binding = registry
        .get(rule_id)
        .ok_or_else(|| EngineError::RuleNotFound(rule_id.to_string()))?;
    let txn = indexes
        .txn_by_id
        .get(transaction_id)
        .map(|&i| &store.transactions[i])
        .ok_or_else(|| EngineError::TransactionNotFound(transaction_id.to_string()))?;

    let feature = indexes
        .feature_by_txn_id
        .get(transaction_id)
        .map(|&i| &store.features[i]);
    let profile = profiles.get(&txn.sender_account_id);

    let params = match overrides {
        Some(map) if !map.is_empty() => merge_overrides(&binding.defaults, map)?,
        _ => binding.defaults.clone(),
    };

    let steps = binding
        .kind
        .evaluate(&EvalInput { txn, feature, profile }, &params);
    let fired = verdict(&steps);

    Ok(EvalTrace {
        rule_id: binding.definition.rule_id.clone(),
        rule_name: binding.definition.name.clone(),
        transaction_id: transaction_id.to_string(),
        fired,
        steps,
    })
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::build_sender_profiles;
    use serde_json::json;

    struct Fixture {
        store: RecordStore,
        indexes: Indexes,
        profiles: HashMap<String, SenderProfile>,
        registry: RuleRegistry,
    }

    fn fixture() -> Fixture {
        let txns = r#"[
            {
                "transaction_id": "TXN_HIGH",
                "txn_date_time": "2024-10-01 14:00:00",
                "sender_account_id": "sender-aaa",
                "receiver_account_id": null,
                "amount": 2500.0, "currency": "USD",
                "transaction_type": "online", "terminal_id": null,
                "merchant_city": "New York", "merchant_country": "USA",
                "merchant_postcode": null,
                "merchant_description_condensed": "Big Purchase"
            },
            {
                "transaction_id": "TXN_LOW",
                "txn_date_time": "2024-10-01 10:00:00",
                "sender_account_id": "sender-bbb",
                "receiver_account_id": null,
                "amount": 5.0, "currency": "USD",
                "transaction_type": "online", "terminal_id": null,
                "merchant_city": "Austin", "merchant_country": "USA",
                "merchant_postcode": null,
                "merchant_description_condensed": "Coffee Shop"
            }
        ]"#;
        let feats = r#"[
            {
                "transaction_id": "TXN_HIGH", "sender_account_id": "sender-aaa",
                "receiver_account_id": null, "amount": 2500.0, "currency": "USD",
                "transaction_type": "online", "transaction_count": 2,
                "avg_transaction_amount": 1250.0, "hour_of_day": 14,
                "day_of_week": 1, "merchant_avg_transaction_amount": 2500.0
            }
        ]"#;
        let rules = r#"[
            {"rule_id": "RULE_001", "name": "High Value Transaction",
             "description": "d", "severity": "high", "action": "flag"},
            {"rule_id": "RULE_002", "name": "Multiple Small Transactions",
             "description": "d", "severity": "medium", "action": "flag"}
        ]"#;
        let store = RecordStore::from_json(txns, feats, rules).unwrap();
        let indexes = Indexes::build(&store);
        let profiles = build_sender_profiles(&store, &indexes);
        // Fixed percentile seeds keep the default threshold at 2048.
        let registry = RuleRegistry::build(&store.rules, 50.0, 2048.0).unwrap();
        Fixture { store, indexes, profiles, registry }
    }

    fn eval(
        f: &Fixture,
        rule_id: &str,
        txn_id: &str,
        overrides: Option<serde_json::Value>,
    ) -> Result<EvalTrace, EngineError> {
        let map = overrides.map(|v| v.as_object().unwrap().clone());
        evaluate(
            &f.registry,
            &f.store,
            &f.indexes,
            &f.profiles,
            rule_id,
            txn_id,
            map.as_ref(),
        )
    }

    #[test]
    fn fired_is_and_of_steps() {
        let f = fixture();
        let trace = eval(&f, "RULE_001", "TXN_HIGH", None).unwrap();
        assert_eq!(trace.fired, trace.steps.iter().all(|s| s.passed));
        assert!(trace.fired);
    }

    #[test]
    fn override_flips_verdict_but_not_actual() {
        let f = fixture();
        let base = eval(&f, "RULE_001", "TXN_HIGH", None).unwrap();
        assert!(base.fired);
        assert_eq!(base.steps[0].threshold, json!(2048.0));
        assert_eq!(base.steps[0].actual, json!(2500.0));

        let raised = eval(&f, "RULE_001", "TXN_HIGH", Some(json!({"amount_threshold": 3000})))
            .unwrap();
        assert!(!raised.fired);
        assert_eq!(raised.steps[0].threshold, json!(3000.0));
        assert_eq!(raised.steps[0].actual, json!(2500.0));
    }

    #[test]
    fn identical_calls_yield_byte_identical_traces() {
        let f = fixture();
        let overrides = json!({"amount_threshold": 1000});
        let a = eval(&f, "RULE_001", "TXN_HIGH", Some(overrides.clone())).unwrap();
        let b = eval(&f, "RULE_001", "TXN_HIGH", Some(overrides)).unwrap();
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn unknown_rule_is_not_found() {
        let f = fixture();
        let err = eval(&f, "RULE_999", "TXN_HIGH", None).unwrap_err();
        assert!(matches!(err, EngineError::RuleNotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn unknown_transaction_is_not_found() {
        let f = fixture();
        let err = eval(&f, "RULE_001", "TXN_MISSING", None).unwrap_err();
        assert!(matches!(err, EngineError::TransactionNotFound(_)));
    }

    #[test]
    fn bad_override_is_rejected() {
        let f = fixture();
        let err = eval(
            &f,
            "RULE_001",
            "TXN_HIGH",
            Some(json!({"amount_threshold": {"nested": true}})),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidOverride { .. }));
    }

    #[test]
    fn missing_feature_vector_yields_empty_not_fired_trace() {
        let f = fixture();
        // TXN_LOW has no feature vector; RULE_002 needs one.
        let trace = eval(&f, "RULE_002", "TXN_LOW", None).unwrap();
        assert!(trace.steps.is_empty());
        assert!(!trace.fired);
    }
}
