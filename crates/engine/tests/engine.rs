//! End-to-end engine tests over a small designed dataset.
//!
//! Dataset shape (21 transactions):
//! - acct-alpha: 9 chip_and_pin + 1 online, all USA, amounts 10/20
//! - acct-beta:  2 online (IRN at 03:00 for 2500, GBR at 12:00 for 100)
//! - acct-gamma: 1 chip_and_pin USA for 250
//! - acct-delta: 8 online USA for 30
//!
//! With these amounts the dataset p50 is 30 and p95 is 250, so the
//! data-driven defaults are amount_threshold=250, small_amount_threshold=30
//! and cross_border_amount_threshold=30.

use serde_json::{json, Value};

use ruletrace_engine::{Engine, ParamValue, RecordStore};

fn txn(
    id: &str,
    sender: &str,
    amount: f64,
    txn_type: &str,
    country: Option<&str>,
    when: &str,
) -> Value {
    json!({
        "transaction_id": id,
        "txn_date_time": when,
        "sender_account_id": sender,
        "receiver_account_id": null,
        "amount": amount,
        "currency": "USD",
        "transaction_type": txn_type,
        "terminal_id": null,
        "merchant_city": null,
        "merchant_country": country,
        "merchant_postcode": null,
        "merchant_description_condensed": format!("purchase {id}")
    })
}

fn feat(id: &str, sender: &str, amount: f64, count: u64, avg: f64, hour: u32) -> Value {
    json!({
        "transaction_id": id,
        "sender_account_id": sender,
        "receiver_account_id": null,
        "amount": amount,
        "currency": "USD",
        "transaction_type": "online",
        "transaction_count": count,
        "avg_transaction_amount": avg,
        "hour_of_day": hour,
        "day_of_week": 1,
        "merchant_avg_transaction_amount": avg
    })
}

fn fixture_json() -> (String, String, String) {
    let mut txns = Vec::new();
    let mut feats = Vec::new();

    for i in 1..=9 {
        let id = format!("TXN_A{i}");
        txns.push(txn(&id, "acct-alpha", 10.0, "chip_and_pin", Some("USA"), "2024-10-01 12:00:00"));
        feats.push(feat(&id, "acct-alpha", 10.0, 10, 11.0, 12));
    }
    txns.push(txn("TXN_A10", "acct-alpha", 20.0, "online", Some("USA"), "2024-10-02 12:00:00"));
    feats.push(feat("TXN_A10", "acct-alpha", 20.0, 10, 11.0, 12));

    txns.push(txn("TXN_B1", "acct-beta", 2500.0, "online", Some("IRN"), "2024-10-03 03:00:00"));
    feats.push(feat("TXN_B1", "acct-beta", 2500.0, 2, 1300.0, 3));
    txns.push(txn("TXN_B2", "acct-beta", 100.0, "online", Some("GBR"), "2024-10-03 12:00:00"));
    feats.push(feat("TXN_B2", "acct-beta", 100.0, 2, 1300.0, 12));

    txns.push(txn("TXN_C1", "acct-gamma", 250.0, "chip_and_pin", Some("USA"), "2024-10-04 10:00:00"));
    feats.push(feat("TXN_C1", "acct-gamma", 250.0, 1, 250.0, 10));

    for i in 1..=8 {
        let id = format!("TXN_D{i}");
        txns.push(txn(&id, "acct-delta", 30.0, "online", Some("USA"), "2024-10-05 12:00:00"));
        feats.push(feat(&id, "acct-delta", 30.0, 8, 31.0, 12));
    }

    let rules = json!([
        {"rule_id": "RULE_001", "name": "High Value Transaction",
         "description": "Unusually large amount", "severity": "high", "action": "flag"},
        {"rule_id": "RULE_002", "name": "Multiple Small Transactions",
         "description": "Many small transfers", "severity": "medium", "action": "flag"},
        {"rule_id": "RULE_003", "name": "Unusual Transaction Type",
         "description": "Type the sender rarely uses", "severity": "low", "action": "flag"},
        {"rule_id": "RULE_004", "name": "High Risk Merchant Country",
         "description": "Sanctioned or high-risk country", "severity": "critical", "action": "block"},
        {"rule_id": "RULE_005", "name": "Cross Border Anomaly",
         "description": "Away from the sender's usual country", "severity": "medium", "action": "flag"},
        {"rule_id": "RULE_006", "name": "Outside Normal Hours",
         "description": "Night-time activity", "severity": "low", "action": "flag"},
        {"rule_id": "RULE_007", "name": "Large Cash Withdrawal",
         "description": "Cash-like type with large amount", "severity": "high", "action": "flag"}
    ]);

    (
        serde_json::to_string(&txns).unwrap(),
        serde_json::to_string(&feats).unwrap(),
        serde_json::to_string(&rules).unwrap(),
    )
}

fn engine() -> Engine {
    let (txns, feats, rules) = fixture_json();
    Engine::from_store(RecordStore::from_json(&txns, &feats, &rules).unwrap()).unwrap()
}

const TOTAL: usize = 21;

#[test]
fn stats_counts_partition_the_dataset() {
    let engine = engine();
    let all = engine.rules_with_stats();
    assert_eq!(all.len(), 7);
    for entry in &all {
        let s = &entry.stats;
        assert_eq!(s.total_transactions, TOTAL);
        assert_eq!(s.fired_count + s.not_fired_count, TOTAL, "{}", s.rule_id);
        let expected_rate =
            (s.fired_count as f64 / TOTAL as f64 * 10_000.0).round() / 10_000.0;
        assert_eq!(s.fire_rate, expected_rate, "{}", s.rule_id);
    }
}

#[test]
fn expected_fired_counts_per_rule() {
    let engine = engine();
    let count = |rule_id: &str| engine.rule_stats(rule_id).unwrap().fired_count;
    assert_eq!(count("RULE_001"), 1, "only TXN_B1 exceeds 250");
    assert_eq!(count("RULE_002"), 10, "alpha has 10 small transactions");
    assert_eq!(count("RULE_003"), 0, "0.1 frequency is not strictly below 0.10");
    assert_eq!(count("RULE_004"), 1, "only IRN is high-risk");
    assert_eq!(count("RULE_005"), 1, "only TXN_B1 crosses the modal border");
    assert_eq!(count("RULE_006"), 1, "only TXN_B1 is at night");
    assert_eq!(count("RULE_007"), 1, "only TXN_C1 is a large chip_and_pin");
}

#[test]
fn cache_agrees_with_live_evaluation_under_defaults() {
    let engine = engine();
    for rule in engine.rules() {
        for txn in engine.transactions() {
            let trace = engine
                .evaluate(&rule.rule_id, &txn.transaction_id, None)
                .unwrap();
            assert_eq!(
                trace.fired,
                engine.is_fired(&rule.rule_id, &txn.transaction_id),
                "{} on {}",
                rule.rule_id,
                txn.transaction_id
            );
            assert_eq!(trace.fired, !trace.steps.is_empty() && trace.steps.iter().all(|s| s.passed));
        }
    }
}

#[test]
fn data_driven_defaults_come_from_percentiles() {
    let engine = engine();
    let defaults = engine.rule_defaults("RULE_001").unwrap();
    assert_eq!(defaults["amount_threshold"], ParamValue::Number(250.0));
    let defaults = engine.rule_defaults("RULE_002").unwrap();
    assert_eq!(defaults["small_amount_threshold"], ParamValue::Number(30.0));
    assert!(engine.rule_defaults("RULE_999").is_none());
}

#[test]
fn high_value_override_is_monotonic() {
    let engine = engine();
    let base = engine.evaluate("RULE_001", "TXN_B1", None).unwrap();
    assert!(base.fired);
    assert_eq!(base.steps[0].actual, json!(2500.0));

    let overrides = json!({"amount_threshold": 3000}).as_object().unwrap().clone();
    let raised = engine.evaluate("RULE_001", "TXN_B1", Some(&overrides)).unwrap();
    assert!(!raised.fired);
    assert_eq!(raised.steps[0].actual, json!(2500.0), "actual never changes");
    assert_eq!(raised.steps[0].threshold, json!(3000.0));

    // The stats cache is untouched by override evaluations.
    assert!(engine.is_fired("RULE_001", "TXN_B1"));
    assert_eq!(engine.rule_stats("RULE_001").unwrap().fired_count, 1);
}

#[test]
fn rare_type_fires_only_with_raised_threshold() {
    let engine = engine();
    let base = engine.evaluate("RULE_003", "TXN_A10", None).unwrap();
    assert!(!base.fired, "0.10 < 0.10 must be false");
    assert_eq!(base.steps[0].actual, json!(0.1));

    let overrides = json!({"rare_type_freq_threshold": 0.15})
        .as_object()
        .unwrap()
        .clone();
    let raised = engine.evaluate("RULE_003", "TXN_A10", Some(&overrides)).unwrap();
    assert!(raised.fired);
}

#[test]
fn cross_border_fires_at_exact_amount() {
    let engine = engine();
    // acct-beta's modal country ties between GBR and IRN; GBR wins the
    // lexicographic tie-break, so the IRN transaction is cross-border.
    let profile = engine.sender_profile("acct-beta").unwrap();
    assert_eq!(profile.modal_country.as_deref(), Some("GBR"));

    let overrides = json!({"cross_border_amount_threshold": 2500})
        .as_object()
        .unwrap()
        .clone();
    let trace = engine.evaluate("RULE_005", "TXN_B1", Some(&overrides)).unwrap();
    assert!(trace.fired, ">= includes equality");
}

#[test]
fn filter_options_list_distinct_values() {
    let engine = engine();
    let options = engine.filter_options();
    assert_eq!(options.countries, vec!["GBR", "IRN", "USA"]);
    assert_eq!(options.transaction_types, vec!["chip_and_pin", "online"]);
    assert_eq!(options.currencies, vec!["USD"]);
    assert_eq!(options.max_amount, 500.0);
}

#[test]
fn load_from_disk_is_idempotent_and_normalizes_tokens() {
    let (txns, feats, rules) = fixture_json();
    // Inject a Python-style NaN hole into one numeric field.
    let txns = txns.replacen("\"receiver_account_id\":null", "\"receiver_account_id\":NaN", 1);

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("transactions.json"), &txns).unwrap();
    std::fs::write(dir.path().join("feature_vectors.json"), &feats).unwrap();
    std::fs::write(dir.path().join("rules.json"), &rules).unwrap();

    let a = Engine::load(dir.path()).unwrap();
    let b = Engine::load(dir.path()).unwrap();

    assert_eq!(
        serde_json::to_value(a.rules_with_stats()).unwrap(),
        serde_json::to_value(b.rules_with_stats()).unwrap()
    );
    assert_eq!(
        serde_json::to_value(a.filter_options()).unwrap(),
        serde_json::to_value(b.filter_options()).unwrap()
    );
    for rule in a.rules() {
        for txn in a.transactions() {
            let ta = a.evaluate(&rule.rule_id, &txn.transaction_id, None).unwrap();
            let tb = b.evaluate(&rule.rule_id, &txn.transaction_id, None).unwrap();
            assert_eq!(ta, tb);
        }
    }
}

#[test]
fn missing_transactions_file_fails_load() {
    let dir = tempfile::tempdir().unwrap();
    let err = Engine::load(dir.path()).unwrap_err();
    assert!(err.to_string().contains("transactions.json"));
}
