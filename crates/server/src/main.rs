use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use ruletrace_engine::Engine;
use ruletrace_server::{api, state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    ruletrace_core::config::load_dotenv();
    let config = ruletrace_core::Config::from_env();
    config.log_summary();

    // Startup barrier: load, index, profile and precompute stats before
    // binding the listener. Any failure here aborts the process.
    let engine = Engine::load(&config.data.data_dir).with_context(|| {
        format!(
            "failed to build engine from {}",
            config.data.data_dir.display()
        )
    })?;

    let app = api::router(Arc::new(state::AppState { engine }));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
