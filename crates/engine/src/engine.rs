//! Engine facade: owns the store and every derived structure, exposes the
//! read API the HTTP layer shapes into responses.
//!
//! Construction is the startup barrier — load, index, profile and stats
//! build all complete (or fail) before any request can be served. After
//! that everything is read-only, so `&self` access is safe to share across
//! concurrent requests without locking.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use ruletrace_core::{
    EngineError, EvalTrace, FeatureVector, RuleDefinition, RuleStats, RuleWithStats, Transaction,
};

use crate::evaluator;
use crate::index::Indexes;
use crate::profile::{build_sender_profiles, SenderProfile};
use crate::rules::params::Params;
use crate::rules::RuleRegistry;
use crate::stats::StatsCache;
use crate::store::RecordStore;

/// Distinct filter values for the transaction listing UI.
#[derive(Debug, Clone, Serialize)]
pub struct FilterOptions {
    pub countries: Vec<String>,
    pub transaction_types: Vec<String>,
    pub currencies: Vec<String>,
    pub max_amount: f64,
}

#[derive(Debug)]
pub struct Engine {
    store: RecordStore,
    indexes: Indexes,
    profiles: HashMap<String, SenderProfile>,
    registry: RuleRegistry,
    stats: StatsCache,
}

impl Engine {
    /// Load the three inputs from `data_dir` and build everything.
    pub fn load(data_dir: &Path) -> Result<Self, EngineError> {
        Self::from_store(RecordStore::load(data_dir)?)
    }

    /// Build all derived structures from an already-loaded store.
    pub fn from_store(store: RecordStore) -> Result<Self, EngineError> {
        let indexes = Indexes::build(&store);
        let profiles = build_sender_profiles(&store, &indexes);
        let registry = RuleRegistry::build(&store.rules, store.amount_p50(), store.amount_p95())?;
        let stats = StatsCache::build(&registry, &store, &indexes, &profiles);
        info!(
            "Engine ready: {} transactions, {} senders, {} rules",
            store.transactions.len(),
            profiles.len(),
            registry.len()
        );
        Ok(Self {
            store,
            indexes,
            profiles,
            registry,
            stats,
        })
    }

    // ── Rules ────────────────────────────────────────────────────────

    pub fn rules(&self) -> Vec<&RuleDefinition> {
        self.registry.iter().map(|b| &b.definition).collect()
    }

    /// Every declared rule joined with its precomputed stats.
    pub fn rules_with_stats(&self) -> Vec<RuleWithStats> {
        self.registry
            .iter()
            .filter_map(|b| {
                self.stats
                    .stats(&b.definition.rule_id)
                    .map(|stats| RuleWithStats {
                        rule: b.definition.clone(),
                        stats: stats.clone(),
                    })
            })
            .collect()
    }

    pub fn rule_stats(&self, rule_id: &str) -> Option<&RuleStats> {
        self.stats.stats(rule_id)
    }

    /// A rule's default parameters (pre-override).
    pub fn rule_defaults(&self, rule_id: &str) -> Option<&Params> {
        self.registry.get(rule_id).map(|b| &b.defaults)
    }

    // ── Records ──────────────────────────────────────────────────────

    pub fn transactions(&self) -> &[Transaction] {
        &self.store.transactions
    }

    pub fn transaction(&self, transaction_id: &str) -> Option<&Transaction> {
        self.indexes
            .txn_by_id
            .get(transaction_id)
            .map(|&i| &self.store.transactions[i])
    }

    pub fn feature_vector(&self, transaction_id: &str) -> Option<&FeatureVector> {
        self.indexes
            .feature_by_txn_id
            .get(transaction_id)
            .map(|&i| &self.store.features[i])
    }

    pub fn sender_profile(&self, sender_id: &str) -> Option<&SenderProfile> {
        self.profiles.get(sender_id)
    }

    // ── Evaluation ───────────────────────────────────────────────────

    /// Live, override-aware evaluation (never consults the stats cache).
    pub fn evaluate(
        &self,
        rule_id: &str,
        transaction_id: &str,
        overrides: Option<&serde_json::Map<String, Value>>,
    ) -> Result<EvalTrace, EngineError> {
        evaluator::evaluate(
            &self.registry,
            &self.store,
            &self.indexes,
            &self.profiles,
            rule_id,
            transaction_id,
            overrides,
        )
    }

    /// O(1) default-parameter verdict from the stats cache.
    pub fn is_fired(&self, rule_id: &str, transaction_id: &str) -> bool {
        self.stats.is_fired(rule_id, transaction_id)
    }

    // ── Filter options ───────────────────────────────────────────────

    /// Distinct countries/types/currencies plus a slider ceiling for the
    /// amount filter (2x the p95 amount).
    pub fn filter_options(&self) -> FilterOptions {
        let mut countries = BTreeSet::new();
        let mut types = BTreeSet::new();
        let mut currencies = BTreeSet::new();
        for txn in &self.store.transactions {
            if let Some(c) = &txn.merchant_country {
                countries.insert(c.clone());
            }
            if !txn.transaction_type.is_empty() {
                types.insert(txn.transaction_type.clone());
            }
            if !txn.currency.is_empty() {
                currencies.insert(txn.currency.clone());
            }
        }
        FilterOptions {
            countries: countries.into_iter().collect(),
            transaction_types: types.into_iter().collect(),
            currencies: currencies.into_iter().collect(),
            max_amount: self.store.amount_p95() * 2.0,
        }
    }
}
