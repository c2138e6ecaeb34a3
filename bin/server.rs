// Camp Ledger - API server
// Run with: cargo run --bin camp-server --features server

use anyhow::Result;
use camp_ledger::api::{build_router, AppState};
use camp_ledger::{Store, VERSION};
use std::env;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let db_path = env::var("CAMP_LEDGER_DB").unwrap_or_else(|_| "camp-ledger.db".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let store = Store::open(&db_path)?;
    info!(db = %db_path, "store ready");

    let app = build_router(AppState {
        store: Arc::new(store),
    });

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Camp Ledger API v{VERSION} listening on {addr}");
    axum::serve(listener, app).await?;

    Ok(())
}
