//! Per-sender historical profiles.
//!
//! Precomputed once after indexing so rules like "type the sender rarely
//! uses" or "cross-border relative to the sender's usual country" never
//! re-scan history per request.

use std::collections::{BTreeMap, HashMap};

use crate::index::Indexes;
use crate::store::RecordStore;

/// Historical summary for one sender account.
#[derive(Debug, Clone, PartialEq)]
pub struct SenderProfile {
    pub sender_id: String,
    /// Most frequent merchant country across the sender's transactions.
    /// Ties break to the lexicographically lowest code; `None` when the
    /// sender has no transaction with a known country.
    pub modal_country: Option<String>,
    /// transaction type → count / typed-transaction total. Sums to 1.0
    /// (within fp tolerance) when non-empty.
    pub type_freq: HashMap<String, f64>,
    pub txn_count: usize,
}

impl SenderProfile {
    /// Observed frequency for a transaction type (0.0 when never seen).
    pub fn type_frequency(&self, transaction_type: &str) -> f64 {
        self.type_freq.get(transaction_type).copied().unwrap_or(0.0)
    }
}

/// Build profiles for every sender group. O(n) across all senders.
pub fn build_sender_profiles(
    store: &RecordStore,
    indexes: &Indexes,
) -> HashMap<String, SenderProfile> {
    let mut profiles = HashMap::with_capacity(indexes.txns_by_sender.len());

    for (sender_id, offsets) in &indexes.txns_by_sender {
        // BTreeMap gives a deterministic iteration order for the modal
        // tie-break (lowest country code wins).
        let mut countries: BTreeMap<&str, usize> = BTreeMap::new();
        let mut types: HashMap<&str, usize> = HashMap::new();

        for &i in offsets {
            let txn = &store.transactions[i];
            if let Some(country) = txn.merchant_country.as_deref() {
                *countries.entry(country).or_insert(0) += 1;
            }
            if !txn.transaction_type.is_empty() {
                *types.entry(&txn.transaction_type).or_insert(0) += 1;
            }
        }

        let modal_country = countries
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(country, _)| country.to_string());

        let typed_total: usize = types.values().sum();
        let type_freq = types
            .into_iter()
            .map(|(t, c)| (t.to_string(), c as f64 / typed_total as f64))
            .collect();

        profiles.insert(
            sender_id.clone(),
            SenderProfile {
                sender_id: sender_id.clone(),
                modal_country,
                type_freq,
                txn_count: offsets.len(),
            },
        );
    }

    profiles
}

// ── Tests ────────────────────────────────────────────────────────────
