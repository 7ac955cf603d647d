//! Derived lookup structures over the record store.
//!
//! Indexes hold offsets into the store's vecs — the store stays the sole
//! owner of the records, the indexes are cheap read-only views.

use std::collections::HashMap;

use crate::store::RecordStore;

/// Lookup indexes built once after the store is loaded. O(n) to build.
#[derive(Debug, Default)]
pub struct Indexes {
    /// transaction_id → offset into `store.transactions`.
    pub txn_by_id: HashMap<String, usize>,
    /// transaction_id → offset into `store.features`.
    pub feature_by_txn_id: HashMap<String, usize>,
    /// sender_account_id → offsets into `store.transactions`, ordered by
    /// transaction timestamp (unparseable timestamps last, ties by id).
    pub txns_by_sender: HashMap<String, Vec<usize>>,
}

impl Indexes {
    /// Build all indexes. Pure function of the store's contents; assumes the
    /// store already validated referential integrity.
    pub fn build(store: &RecordStore) -> Self {
        let mut txn_by_id = HashMap::with_capacity(store.transactions.len());
        let mut txns_by_sender: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, txn) in store.transactions.iter().enumerate() {
            txn_by_id.insert(txn.transaction_id.clone(), i);
            txns_by_sender
                .entry(txn.sender_account_id.clone())
                .or_default()
                .push(i);
        }

        for offsets in txns_by_sender.values_mut() {
            offsets.sort_by(|&a, &b| {
                let (ta, tb) = (&store.transactions[a], &store.transactions[b]);
                match (ta.timestamp(), tb.timestamp()) {
                    (Some(x), Some(y)) => x
                        .cmp(&y)
                        .then_with(|| ta.transaction_id.cmp(&tb.transaction_id)),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => ta.transaction_id.cmp(&tb.transaction_id),
                }
            });
        }

        let mut feature_by_txn_id = HashMap::with_capacity(store.features.len());
        for (i, feat) in store.features.iter().enumerate() {
            feature_by_txn_id.insert(feat.transaction_id.clone(), i);
        }

        Self {
            txn_by_id,
            feature_by_txn_id,
            txns_by_sender,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
