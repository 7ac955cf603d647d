//! Shared domain types for the rule debugging engine.
//!
//! This crate holds:
//! - typed records for the three raw inputs (transactions, feature vectors,
//!   rule declarations)
//! - evaluation trace and statistics types
//! - the engine error taxonomy
//! - env-driven configuration

pub mod config;
pub mod error;
pub mod record;
pub mod trace;

pub use config::Config;
pub use error::EngineError;
pub use record::{Action, FeatureVector, RuleDefinition, Severity, Transaction};
pub use trace::{CmpOp, EvalStep, EvalTrace, RuleStats, RuleWithStats};
