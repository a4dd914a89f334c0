use axum::{
    extract::{OriginalUri, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use database::Database;
use std::sync::Arc;
use std::time::Instant;
use crate::AppState;

/// Append-only writer for the `logs` table.
///
/// Handed to the router through `AppState`, so each deployment (or test)
/// decides whether requests are recorded.
#[derive(Clone)]
pub struct AuditLog {
    db: Option<Database>,
}

impl AuditLog {
    pub fn new(db: Database) -> Self {
        Self { db: Some(db) }
    }

    pub fn noop() -> Self {
        Self { db: None }
    }

    pub async fn success(&self, message: &str, duration_ms: i64, timestamp: DateTime<Utc>) {
        self.record(&format!("Success - {}", message), duration_ms, timestamp).await;
    }

    pub async fn error(&self, message: &str, duration_ms: i64, timestamp: DateTime<Utc>) {
        self.record(&format!("Error - {}", message), duration_ms, timestamp).await;
    }

    async fn record(&self, message: &str, duration_ms: i64, timestamp: DateTime<Utc>) {
        let Some(db) = &self.db else {
            return;
        };

        let result = sqlx::query(
            "INSERT INTO logs (message, duration_ms, timestamp) VALUES ($1, $2, $3)",
        )
        .bind(message)
        .bind(duration_ms)
        .bind(timestamp.to_rfc3339())
        .execute(&db.pool)
        .await;

        // Audit failures never fail the request.
        if let Err(e) = result {
            tracing::warn!("Failed to write audit entry: {}", e);
        }
    }
}

pub async fn audit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let timestamp = Utc::now();
    // Nested routers see a stripped URI.
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let line = format!("{} {}", request.method(), path);

    let response = next.run(request).await;

    let duration_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
    let status = response.status();
    let message = format!("{} -> {}", line, status.as_u16());

    if status.is_client_error() || status.is_server_error() {
        state.audit.error(&message, duration_ms, timestamp).await;
    } else {
        state.audit.success(&message, duration_ms, timestamp).await;
    }

    response
}
