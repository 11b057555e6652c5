use std::env;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use newsdesk::core::logging;
use newsdesk::server::router;
use newsdesk::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let state = AppState::initialize()?;
    logging::init(&state.paths);

    // Ingestion and index-build failures are fatal: the app cannot serve
    // queries without an index.
    state
        .pipeline
        .warm_up()
        .await
        .context("Failed to build the corpus index")?;

    let port = env::var("PORT")
        .ok()
        .and_then(|val| val.parse::<u16>().ok())
        .unwrap_or(8080);
    let bind_addr = format!("127.0.0.1:{}", port);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = router::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
