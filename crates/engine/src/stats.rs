//! Precomputed per-rule statistics and fired-transaction sets.
//!
//! Built once at startup by evaluating every (rule, transaction) pair under
//! each rule's default parameters — the only O(rules × transactions) pass in
//! the system. Override-based evaluations never touch this cache.

use std::collections::{HashMap, HashSet};

use tracing::info;

use ruletrace_core::RuleStats;

use crate::index::Indexes;
use crate::profile::SenderProfile;
use crate::rules::{round4, verdict, EvalInput, RuleRegistry};
use crate::store::RecordStore;

/// Per-rule stats and fired-id sets under default parameters.
#[derive(Debug)]
pub struct StatsCache {
    stats: HashMap<String, RuleStats>,
    fired_sets: HashMap<String, HashSet<String>>,
}

impl StatsCache {
    /// Batch-evaluate every rule against every transaction once.
    pub fn build(
        registry: &RuleRegistry,
        store: &RecordStore,
        indexes: &Indexes,
        profiles: &HashMap<String, SenderProfile>,
    ) -> Self {
        let total = store.transactions.len();
        let mut stats = HashMap::with_capacity(registry.len());
        let mut fired_sets = HashMap::with_capacity(registry.len());

        for binding in registry.iter() {
            let mut fired_ids: HashSet<String> = HashSet::new();

            for txn in &store.transactions {
                let feature = indexes
                    .feature_by_txn_id
                    .get(&txn.transaction_id)
                    .map(|&i| &store.features[i]);
                let profile = profiles.get(&txn.sender_account_id);
                let steps = binding.kind.evaluate(
                    &EvalInput { txn, feature, profile },
                    &binding.defaults,
                );
                if verdict(&steps) {
                    fired_ids.insert(txn.transaction_id.clone());
                }
            }

            let fired_count = fired_ids.len();
            let fire_rate = if total > 0 {
                round4(fired_count as f64 / total as f64)
            } else {
                0.0
            };
            let def = &binding.definition;
            stats.insert(
                def.rule_id.clone(),
                RuleStats {
                    rule_id: def.rule_id.clone(),
                    rule_name: def.name.clone(),
                    total_transactions: total,
                    fired_count,
                    not_fired_count: total - fired_count,
                    fire_rate,
                    severity: def.severity,
                    action: def.action,
                },
            );
            fired_sets.insert(def.rule_id.clone(), fired_ids);
        }

        info!(
            "Stats cache built: {} rules x {} transactions",
            registry.len(),
            total
        );

        Self { stats, fired_sets }
    }

    /// Precomputed stats for a rule, if known.
    pub fn stats(&self, rule_id: &str) -> Option<&RuleStats> {
        self.stats.get(rule_id)
    }

    /// O(1) default-parameter verdict check; false for unknown rules.
    pub fn is_fired(&self, rule_id: &str, transaction_id: &str) -> bool {
        self.fired_sets
            .get(rule_id)
            .is_some_and(|set| set.contains(transaction_id))
    }

    /// The set of transaction ids a rule fires on, if the rule is known.
    pub fn fired_set(&self, rule_id: &str) -> Option<&HashSet<String>> {
        self.fired_sets.get(rule_id)
    }
}
