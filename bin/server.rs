// Pokemon TODO - Web Server
// REST API with Axum over the shared SQLite store

use anyhow::{Context, Result};
use tracing::info;

use pokemon_todo::api::{cors_layer, router, AppState};
use pokemon_todo::logging::init_logging;
use pokemon_todo::{open_database, PowerEstimator, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_dotenv().context("Failed to load settings")?;
    init_logging(settings.log_level());

    println!("🎮 Pokemon TODO - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // Open database (schema created on first run)
    let conn = open_database(settings.database_path())
        .with_context(|| format!("Failed to open database at {}", settings.database_path()))?;
    println!("✓ Database opened: {}", settings.database_path());

    // Power Estimator, built once and shared by all requests
    let estimator = PowerEstimator::from_settings(&settings)?;
    info!(url = %settings.lm_studio_url, model = %settings.lm_studio_model, "power estimator configured");

    let state = AppState::new(conn, estimator);
    let app = router(state, cors_layer(&settings.cors_origins_list()));

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_addr))?;

    println!("\n🚀 Server running on http://{}", settings.bind_addr);
    println!("   API:    http://{}/api/v1/pokemon", settings.bind_addr);
    println!("   AI:     http://{}/api/v1/ai/health", settings.bind_addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl+C");
    }
}
