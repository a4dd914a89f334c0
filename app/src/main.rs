use axum::{middleware, Router};
use clap::Parser;
use common::{AppState, Config, audit::{AuditLog, audit_middleware}};
use database::Database;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize Logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load Config from .env, env vars and CLI args
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }
    let config = Config::parse();

    // 3. Initialize Database
    let db = Database::new(&config.database_url).await?;
    db.run_migrations().await?;

    let audit = if config.audit_log {
        AuditLog::new(db.clone())
    } else {
        tracing::warn!("AUDIT_LOG is disabled. Requests will not be recorded in the logs table.");
        AuditLog::noop()
    };

    let state = Arc::new(AppState { db, audit });

    // 4. Routing
    let api_routes = Router::<Arc<AppState>>::new()
        .nest("/cards", cards::handler::cards_router(state.clone()))
        .layer(middleware::from_fn_with_state(state.clone(), audit_middleware));

    let app = Router::<Arc<AppState>>::new()
        .nest("/api/v1", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    // 5. Start Server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
