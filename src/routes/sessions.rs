use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{ensure_owner, session};
use crate::db;
use crate::db::models::Session;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::extractors::{BearerToken, ClientInfo};
use crate::routes::authed;
use crate::social::users;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/user/session", post(login).delete(logout))
        .route("/user/session/list", get(list_sessions))
        .route("/user/session/{id}", delete(revoke_session))
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
}

async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let access_token = db::transaction(&state.db, |conn| {
        users::login(
            conn,
            &state.hasher,
            &req.username,
            &req.password,
            &client.ip,
            &client.user_agent,
        )
    })?;
    Ok(Json(LoginResponse { access_token }))
}

async fn logout(State(state): State<AppState>, bearer: BearerToken) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        let session_id = principal.require_session()?;
        session::revoke_session(conn, session_id)?;
        tracing::info!("User {} logged out", principal.user_id());
        Ok(())
    })?;
    Ok(Json(json!({})))
}

#[derive(Serialize)]
struct SessionEntry {
    #[serde(flatten)]
    session: Session,
    current: bool,
}

async fn list_sessions(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> AppResult<Json<Vec<SessionEntry>>> {
    let sessions = authed(&state, &bearer, |conn, principal| {
        let current = principal.require_session()?;
        let sessions = session::list_sessions(conn, principal.user_id())?;
        Ok(sessions
            .into_iter()
            .map(|session| SessionEntry {
                current: session.id == current,
                session,
            })
            .collect())
    })?;
    Ok(Json(sessions))
}

async fn revoke_session(
    State(state): State<AppState>,
    bearer: BearerToken,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        let current = principal.require_session()?;
        let target = session::get_session(conn, id)?
            .ok_or(AppError::NotFound(ErrorCode::SessionNotFound))?;
        ensure_owner(target.user_id, principal)?;
        if target.id == current {
            return Err(AppError::Validation(ErrorCode::CannotRevokeCurrentSession));
        }
        session::revoke_session(conn, target.id)
    })?;
    Ok(Json(json!({})))
}
