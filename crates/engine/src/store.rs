//! Record store: loads and normalizes the three raw inputs.
//!
//! The upstream feed is exported from a dataframe pipeline and may contain
//! bare `NaN` / `Infinity` / `-Infinity` tokens, which strict JSON rejects.
//! [`normalize_missing_tokens`] rewrites those to `null` in a single
//! string-literal-aware pass before parsing, so every downstream consumer
//! only ever sees canonical nulls.
//!
//! Loading is atomic: any malformed input or referential-integrity violation
//! fails the whole load and nothing is exposed.

use std::collections::HashSet;
use std::path::Path;

use tracing::info;

use ruletrace_core::{EngineError, FeatureVector, RuleDefinition, Transaction};

/// Input file names expected under the data directory.
pub const TRANSACTIONS_FILE: &str = "transactions.json";
pub const FEATURE_VECTORS_FILE: &str = "feature_vectors.json";
pub const RULES_FILE: &str = "rules.json";

// ── Missing-token normalization ──────────────────────────────────────

/// Rewrite bare `NaN`, `Infinity` and `-Infinity` tokens to `null`.
///
/// Tokens inside JSON string literals are left untouched; the scanner
/// tracks string/escape state instead of doing a blind replace.
pub fn normalize_missing_tokens(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' => {
                in_string = true;
                out.push(b'"');
                i += 1;
            }
            b'N' if bytes[i..].starts_with(b"NaN") => {
                out.extend_from_slice(b"null");
                i += 3;
            }
            b'I' if bytes[i..].starts_with(b"Infinity") => {
                out.extend_from_slice(b"null");
                i += 8;
            }
            b'-' if bytes[i + 1..].starts_with(b"Infinity") => {
                out.extend_from_slice(b"null");
                i += 9;
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    // Only ASCII tokens were replaced with ASCII, so the output stays
    // valid UTF-8.
    String::from_utf8(out).unwrap_or_default()
}

// ── Record store ─────────────────────────────────────────────────────

/// Owns the canonical transaction, feature-vector and rule collections.
///
/// Built once at startup; read-only thereafter. Derived indexes reference
/// records by offset into these vecs rather than cloning them.
#[derive(Debug)]
pub struct RecordStore {
    pub transactions: Vec<Transaction>,
    pub features: Vec<FeatureVector>,
    pub rules: Vec<RuleDefinition>,
    amount_p50: f64,
    amount_p95: f64,
}

impl RecordStore {
    /// Load the three inputs from `data_dir`.
    pub fn load(data_dir: &Path) -> Result<Self, EngineError> {
        let read = |name: &str| -> Result<String, EngineError> {
            std::fs::read_to_string(data_dir.join(name)).map_err(|e| {
                EngineError::DataLoad(format!("cannot read {}: {}", data_dir.join(name).display(), e))
            })
        };
        let store = Self::from_json(
            &read(TRANSACTIONS_FILE)?,
            &read(FEATURE_VECTORS_FILE)?,
            &read(RULES_FILE)?,
        )?;
        info!(
            "Record store loaded: {} transactions, {} feature vectors, {} rules",
            store.transactions.len(),
            store.features.len(),
            store.rules.len()
        );
        Ok(store)
    }

    /// Build a store from in-memory JSON documents.
    pub fn from_json(
        transactions_json: &str,
        features_json: &str,
        rules_json: &str,
    ) -> Result<Self, EngineError> {
        let transactions: Vec<Transaction> =
            serde_json::from_str(&normalize_missing_tokens(transactions_json))?;
        let features: Vec<FeatureVector> =
            serde_json::from_str(&normalize_missing_tokens(features_json))?;
        let rules: Vec<RuleDefinition> = serde_json::from_str(rules_json)?;

        // Integrity: unique transaction ids.
        let mut seen: HashSet<&str> = HashSet::with_capacity(transactions.len());
        for txn in &transactions {
            if !seen.insert(&txn.transaction_id) {
                return Err(EngineError::DataLoad(format!(
                    "duplicate transaction id: {}",
                    txn.transaction_id
                )));
            }
        }

        // Integrity: every feature vector references a known transaction.
        for feat in &features {
            if !seen.contains(feat.transaction_id.as_str()) {
                return Err(EngineError::DataLoad(format!(
                    "feature vector references unknown transaction: {}",
                    feat.transaction_id
                )));
            }
        }

        let (amount_p50, amount_p95) = amount_percentiles(&transactions);

        Ok(Self {
            transactions,
            features,
            rules,
            amount_p50,
            amount_p95,
        })
    }

    /// Median transaction amount across the whole dataset.
    pub fn amount_p50(&self) -> f64 {
        self.amount_p50
    }

    /// 95th-percentile transaction amount across the whole dataset.
    pub fn amount_p95(&self) -> f64 {
        self.amount_p95
    }
}

/// Dataset-wide (p50, p95) amounts, used to seed data-driven rule defaults.
fn amount_percentiles(transactions: &[Transaction]) -> (f64, f64) {
    if transactions.is_empty() {
        // Fallbacks for an empty dataset, matching the defaults the rules
        // were originally tuned with.
        return (50.0, 500.0);
    }
    let mut amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
    amounts.sort_by(|a, b| a.total_cmp(b));
    let pick = |q: f64| {
        let idx = ((amounts.len() as f64) * q) as usize;
        amounts[idx.min(amounts.len() - 1)]
    };
    (pick(0.50), pick(0.95))
}

// ── Tests ────────────────────────────────────────────────────────────
