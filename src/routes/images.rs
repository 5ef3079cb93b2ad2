use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::extractors::BearerToken;
use crate::routes::authed;
use crate::social::images;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/image", post(register_image))
        .route("/image/orphans", get(list_orphans))
}

async fn register_image(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> AppResult<(StatusCode, Json<Value>)> {
    let image = authed(&state, &bearer, |conn, principal| {
        images::register_image(conn, principal)
    })?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "identifier": image.identifier })),
    ))
}

async fn list_orphans(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> AppResult<Json<Value>> {
    let orphans = authed(&state, &bearer, |conn, principal| {
        images::list_orphans(conn, principal)
    })?;
    Ok(Json(json!({ "orphans": orphans })))
}
