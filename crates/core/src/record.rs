//! Typed records for the three raw inputs: transactions, feature vectors,
//! and rule declarations.
//!
//! Fields that arrive with missing-value holes in the upstream export are
//! `Option<_>`; the loader normalizes non-standard missing tokens to JSON
//! `null` before these types ever see the data, so no per-read sanitizing
//! happens here.

use serde::{Deserialize, Serialize};

// ── Transaction ──────────────────────────────────────────────────────

/// A single card/payment transaction as exported by the upstream feed.
///
/// Loaded once at startup and never mutated. `transaction_id` is unique
/// across the store (enforced by the loader).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub txn_date_time: String,
    pub sender_account_id: String,
    /// Numeric in the raw export (with NaN holes), hence not a String.
    pub receiver_account_id: Option<f64>,
    pub amount: f64,
    pub currency: String,
    pub transaction_type: String,
    pub terminal_id: Option<f64>,
    pub merchant_city: Option<String>,
    pub merchant_country: Option<String>,
    pub merchant_postcode: Option<String>,
    pub merchant_description_condensed: Option<String>,
}

impl Transaction {
    /// Parse the transaction timestamp (`YYYY-MM-DD HH:MM:SS`).
    ///
    /// Returns `None` for malformed timestamps; callers that order by time
    /// must sort those last rather than fail.
    pub fn timestamp(&self) -> Option<chrono::NaiveDateTime> {
        chrono::NaiveDateTime::parse_from_str(&self.txn_date_time, "%Y-%m-%d %H:%M:%S").ok()
    }
}

// ── Feature vector ───────────────────────────────────────────────────

/// Precomputed per-transaction features, one-to-one with [`Transaction`]
/// by `transaction_id`.
///
/// Carries the transaction's own amount/currency/type plus derived fields
/// (sender history counts, time-of-day buckets, merchant averages).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub transaction_id: String,
    pub sender_account_id: String,
    pub receiver_account_id: Option<f64>,
    pub amount: f64,
    pub currency: String,
    pub transaction_type: String,
    /// Sender's historical transaction count.
    pub transaction_count: u64,
    pub avg_transaction_amount: f64,
    pub hour_of_day: u32,
    pub day_of_week: u32,
    pub merchant_avg_transaction_amount: f64,
}

// ── Rule declaration ─────────────────────────────────────────────────

/// How severe a rule firing is considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// What the downstream system does when a rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Allow,
    Flag,
    Block,
}

/// Declarative rule metadata from the rule declarations input.
///
/// Static configuration: loaded once, never mutated. The evaluator bound to
/// `rule_id` lives in the engine's rule registry, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub rule_id: String,
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub action: Action,
}

// ── Tests ────────────────────────────────────────────────────────────
