//! Rule evaluation & indexing engine.
//!
//! This crate provides:
//! - the record store with load-time normalization of missing-value tokens
//! - derived indexes and per-sender historical profiles
//! - the rule registry with seven explainable evaluators
//! - trace-producing evaluation with parameter overrides
//! - the precomputed per-rule stats cache

pub mod engine;
pub mod evaluator;
pub mod index;
pub mod profile;
pub mod rules;
pub mod stats;
pub mod store;

pub use engine::{Engine, FilterOptions};
pub use index::Indexes;
pub use profile::{build_sender_profiles, SenderProfile};
pub use rules::params::{ParamValue, Params};
pub use rules::{EvalInput, RuleKind, RuleRegistry};
pub use stats::StatsCache;
pub use store::RecordStore;
