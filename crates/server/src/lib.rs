//! HTTP server for the rule debugging engine: request/response shaping over
//! `ruletrace-engine`.

pub mod api;
pub mod state;
