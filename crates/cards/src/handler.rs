use crate::models::{Card, CreateCardRequest, UpdateCardRequest};
use crate::service::{CardError, CardService};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use common::AppState;
use serde_json::json;
use std::sync::Arc;

/// Renders `{"code": ..., "message": ...}`, where `code` is the snake_case
/// reason phrase of `status` (e.g. 404 -> "not_found").
fn error_response(status: StatusCode, msg: String) -> Response {
    let code = status
        .canonical_reason()
        .unwrap_or("error")
        .to_lowercase()
        .replace(' ', "_");

    (status, Json(json!({ "code": code, "message": msg }))).into_response()
}

fn card_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, Response> {
    path.map(|Path(id)| id).map_err(|e| {
        tracing::debug!("Rejected card id: {}", e);
        error_response(StatusCode::BAD_REQUEST, "invalid id".to_string())
    })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(value)| value).map_err(|e| {
        tracing::debug!("Rejected request body: {}", e);
        error_response(
            StatusCode::BAD_REQUEST,
            "invalid request body parameters".to_string(),
        )
    })
}

impl CardError {
    fn status(&self) -> StatusCode {
        match self {
            CardError::NotFound => StatusCode::NOT_FOUND,
            CardError::Exists => StatusCode::CONFLICT,
            CardError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CardError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn respond_with(self, status: StatusCode) -> Response {
        let msg = match self {
            CardError::NotFound => "card not found".to_string(),
            CardError::Exists => "card already exists".to_string(),
            CardError::InvalidBody(msg) => msg,
            CardError::Unexpected(detail) => {
                tracing::error!("Unexpected card error: {}", detail);
                "unexpected server error".to_string()
            }
        };

        error_response(status, msg)
    }
}

impl IntoResponse for CardError {
    fn into_response(self) -> Response {
        let status = self.status();
        self.respond_with(status)
    }
}

pub fn cards_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_cards).post(create_card))
        .route("/{id}", get(get_card).patch(update_card).delete(delete_card))
        .with_state(state)
}

async fn list_cards(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, Response> {
    let cards = CardService::list_cards(&state.db).await.map_err(|e| match e {
        CardError::Unexpected(_) => e.respond_with(StatusCode::SERVICE_UNAVAILABLE),
        other => other.into_response(),
    })?;
    Ok(Json(json!({ "data": cards })))
}

async fn get_card(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<serde_json::Value>, Response> {
    let id = card_id(path)?;
    let card = CardService::get_card(&state.db, id)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(json!({ "data": card })))
}

async fn create_card(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCardRequest>, JsonRejection>,
) -> Result<impl IntoResponse, Response> {
    let req = body(payload)?;
    let card: Card = CardService::create_card(&state.db, req)
        .await
        .map_err(IntoResponse::into_response)?;
    tracing::info!("Created card {}", card.card_id);
    Ok((StatusCode::CREATED, Json(json!({ "data": card }))))
}

async fn update_card(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateCardRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, Response> {
    let id = card_id(path)?;
    let req = body(payload)?;
    let card = CardService::update_card(&state.db, id, req)
        .await
        .map_err(|e| match e {
            CardError::InvalidBody(_) => e.respond_with(StatusCode::BAD_REQUEST),
            other => other.into_response(),
        })?;
    Ok(Json(json!({ "data": card })))
}

async fn delete_card(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, Response> {
    let id = card_id(path)?;
    CardService::delete_card(&state.db, id)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(StatusCode::NO_CONTENT)
}
