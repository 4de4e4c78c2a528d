// Fund Catalog - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use fund_catalog::api::{create_router, AppState};
use fund_catalog::config::AppConfig;
use fund_catalog::db::{count_funds, open_database};
use fund_catalog::logging::init_server_logging;
use std::path::PathBuf;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_server_logging();

    info!("Fund Catalog Server v{}", env!("CARGO_PKG_VERSION"));

    // Optional config path as the first argument
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    let conn = open_database(&config.database_path).with_context(|| {
        format!("Failed to open database: {}", config.database_path.display())
    })?;
    info!(
        path = %config.database_path.display(),
        funds = count_funds(&conn)?,
        "Database opened"
    );

    let app = create_router(AppState::new(conn), config.max_upload_bytes);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Server running on http://{}", addr);
    info!("API: http://{}/api/fund/", addr);

    axum::serve(listener, app)
        .await
        .context("Server terminated unexpectedly")?;

    Ok(())
}
