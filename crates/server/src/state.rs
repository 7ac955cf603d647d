use std::sync::Arc;

use ruletrace_engine::Engine;

/// Shared read-only application state. The engine is fully built before the
/// router starts serving, so no locking is needed.
pub struct AppState {
    pub engine: Engine,
}

pub type SharedState = Arc<AppState>;
