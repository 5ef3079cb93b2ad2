use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{api_keys, ensure_owner};
use crate::db::flags::ApiKeyPermissions;
use crate::db::models::ApiKey;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::extractors::BearerToken;
use crate::routes::authed;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api_key",
        post(create_key).get(list_keys).delete(revoke_key),
    )
}

#[derive(Deserialize)]
struct CreateKey {
    permissions: ApiKeyPermissions,
}

#[derive(Serialize)]
struct CreatedKey {
    /// Shown once; only its digest is stored.
    api_key: String,
    #[serde(flatten)]
    key: ApiKey,
}

async fn create_key(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<CreateKey>,
) -> AppResult<(StatusCode, Json<CreatedKey>)> {
    let (api_key, key) = authed(&state, &bearer, |conn, principal| {
        principal.require_session()?;
        let created = api_keys::create_api_key(conn, principal.user_id(), req.permissions)?;
        tracing::info!(
            "User {} created API key {}",
            principal.user_id(),
            created.1.id
        );
        Ok(created)
    })?;
    Ok((StatusCode::CREATED, Json(CreatedKey { api_key, key })))
}

async fn list_keys(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> AppResult<Json<Vec<ApiKey>>> {
    let keys = authed(&state, &bearer, |conn, principal| {
        principal.require_session()?;
        api_keys::list_api_keys(conn, principal.user_id())
    })?;
    Ok(Json(keys))
}

#[derive(Deserialize)]
struct KeyRef {
    key_id: i64,
}

async fn revoke_key(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<KeyRef>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        principal.require_session()?;
        let key = api_keys::get_api_key(conn, req.key_id)?
            .ok_or(AppError::NotFound(ErrorCode::ApiKeyNotFound))?;
        ensure_owner(key.owner_id, principal)?;
        api_keys::revoke_api_key(conn, key.id)?;
        tracing::info!("User {} revoked API key {}", principal.user_id(), key.id);
        Ok(())
    })?;
    Ok(Json(json!({})))
}
