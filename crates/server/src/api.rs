//! HTTP surface: thin request/response shaping over the engine.
//!
//! All algorithmic work lives in `ruletrace-engine`; handlers here only
//! parse query parameters, consult the engine, and map errors to statuses
//! (not-found conditions to 404, invalid overrides to 400).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use ruletrace_core::{
    EngineError, EvalTrace, FeatureVector, RuleDefinition, RuleStats, RuleWithStats, Transaction,
};
use ruletrace_engine::{FilterOptions, Params};

use crate::state::{AppState, SharedState};

/// Default page size for the transaction listing.
const DEFAULT_LIMIT: usize = 50;
/// Hard cap on page size.
const MAX_LIMIT: usize = 500;

type ApiError = (StatusCode, Json<Value>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

fn not_found(message: impl Into<String>) -> ApiError {
    error(StatusCode::NOT_FOUND, message)
}

/// Build the full application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/rules", get(list_rules))
        .route("/api/rules_with_stats", get(rules_with_stats))
        .route("/api/rules/{rule_id}/defaults", get(rule_defaults))
        .route("/api/rule_stats", get(rule_stats))
        .route("/api/filter_options", get(filter_options))
        .route("/api/transactions", get(list_transactions))
        .route("/api/transactions/{transaction_id}", get(get_transaction))
        .route("/api/transactions/{transaction_id}/features", get(get_features))
        .route("/api/evaluate", get(evaluate))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Health ───────────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ── Rules ────────────────────────────────────────────────────────────

async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<RuleDefinition>> {
    Json(state.engine.rules().into_iter().cloned().collect())
}

/// All rules enriched with precomputed fire-rate stats (single request).
async fn rules_with_stats(State(state): State<Arc<AppState>>) -> Json<Vec<RuleWithStats>> {
    Json(state.engine.rules_with_stats())
}

#[derive(Debug, Serialize)]
struct RuleDefaultsResponse {
    rule_id: String,
    params: Params,
}

async fn rule_defaults(
    State(state): State<Arc<AppState>>,
    Path(rule_id): Path<String>,
) -> Result<Json<RuleDefaultsResponse>, ApiError> {
    let params = state
        .engine
        .rule_defaults(&rule_id)
        .ok_or_else(|| not_found(format!("No defaults for {rule_id}")))?;
    Ok(Json(RuleDefaultsResponse {
        rule_id,
        params: params.clone(),
    }))
}

#[derive(Debug, Deserialize)]
struct RuleStatsQuery {
    rule_id: String,
}

async fn rule_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RuleStatsQuery>,
) -> Result<Json<RuleStats>, ApiError> {
    state
        .engine
        .rule_stats(&query.rule_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("Rule not found"))
}

// ── Filter options ───────────────────────────────────────────────────

async fn filter_options(State(state): State<Arc<AppState>>) -> Json<FilterOptions> {
    Json(state.engine.filter_options())
}

// ── Transactions ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TransactionsQuery {
    offset: Option<usize>,
    limit: Option<usize>,
    sender_account_id: Option<String>,
    merchant_country: Option<String>,
    transaction_type: Option<String>,
    min_amount: Option<f64>,
    max_amount: Option<f64>,
    query: Option<String>,
    rule_id: Option<String>,
    fired: Option<bool>,
}

#[derive(Debug, Serialize)]
struct PaginatedTransactions {
    total: usize,
    offset: usize,
    limit: usize,
    items: Vec<Transaction>,
}

fn matches_text(txn: &Transaction, needle: &str) -> bool {
    let contains = |field: Option<&str>| {
        field.is_some_and(|v| v.to_lowercase().contains(needle))
    };
    txn.transaction_id.to_lowercase().contains(needle)
        || txn.sender_account_id.to_lowercase().contains(needle)
        || contains(txn.merchant_description_condensed.as_deref())
        || contains(txn.merchant_city.as_deref())
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TransactionsQuery>,
) -> Json<PaginatedTransactions> {
    let engine = &state.engine;
    let needle = q.query.as_deref().map(str::to_lowercase);

    let filtered: Vec<&Transaction> = engine
        .transactions()
        .iter()
        .filter(|t| {
            q.sender_account_id
                .as_deref()
                .is_none_or(|s| t.sender_account_id == s)
        })
        .filter(|t| {
            q.merchant_country
                .as_deref()
                .is_none_or(|c| t.merchant_country.as_deref() == Some(c))
        })
        .filter(|t| {
            q.transaction_type
                .as_deref()
                .is_none_or(|ty| t.transaction_type == ty)
        })
        .filter(|t| q.min_amount.is_none_or(|min| t.amount >= min))
        .filter(|t| q.max_amount.is_none_or(|max| t.amount <= max))
        .filter(|t| needle.as_deref().is_none_or(|n| matches_text(t, n)))
        .filter(|t| match (&q.rule_id, q.fired) {
            // O(1) membership check against the precomputed fired set.
            (Some(rule_id), Some(fired)) => {
                engine.is_fired(rule_id, &t.transaction_id) == fired
            }
            _ => true,
        })
        .collect();

    let total = filtered.len();
    let offset = q.offset.unwrap_or(0);
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let items = filtered
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    Json(PaginatedTransactions {
        total,
        offset,
        limit,
        items,
    })
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    state
        .engine
        .transaction(&transaction_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("Transaction not found"))
}

async fn get_features(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<String>,
) -> Result<Json<FeatureVector>, ApiError> {
    state
        .engine
        .feature_vector(&transaction_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found("Feature vector not found"))
}

// ── Evaluation ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct EvaluateQuery {
    rule_id: String,
    transaction_id: String,
    /// JSON-encoded flat object of parameter overrides.
    overrides: Option<String>,
}

async fn evaluate(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EvaluateQuery>,
) -> Result<Json<EvalTrace>, ApiError> {
    let overrides = match q.overrides.as_deref() {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)
                .map_err(|_| error(StatusCode::BAD_REQUEST, "overrides must be valid JSON"))?;
            match value {
                Value::Object(map) => Some(map),
                _ => {
                    return Err(error(
                        StatusCode::BAD_REQUEST,
                        "overrides must be a JSON object",
                    ))
                }
            }
        }
        None => None,
    };

    state
        .engine
        .evaluate(&q.rule_id, &q.transaction_id, overrides.as_ref())
        .map(Json)
        .map_err(|e| match &e {
            EngineError::InvalidOverride { .. } => error(StatusCode::BAD_REQUEST, e.to_string()),
            err if err.is_not_found() => not_found(e.to_string()),
            _ => error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        })
}
