use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db::models::InviteCode;
use crate::error::AppResult;
use crate::extractors::BearerToken;
use crate::routes::authed;
use crate::social::{graph, invites};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/user", post(follow).delete(unfollow))
        .route("/block/user", post(block).delete(unblock))
        .route("/invite_code", post(generate_invite).get(list_invites))
}

#[derive(Deserialize)]
struct UserRef {
    username: String,
}

async fn follow(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<UserRef>,
) -> AppResult<(StatusCode, Json<Value>)> {
    authed(&state, &bearer, |conn, principal| {
        graph::follow(conn, principal, &req.username)
    })?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn unfollow(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<UserRef>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        graph::unfollow(conn, principal, &req.username)
    })?;
    Ok(Json(json!({})))
}

async fn block(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<UserRef>,
) -> AppResult<(StatusCode, Json<Value>)> {
    authed(&state, &bearer, |conn, principal| {
        graph::block(conn, principal, &req.username)
    })?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn unblock(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<UserRef>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        graph::unblock(conn, principal, &req.username)
    })?;
    Ok(Json(json!({})))
}

async fn generate_invite(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> AppResult<(StatusCode, Json<InviteCode>)> {
    let limit = state.config.accounts.invite_codes_per_user;
    let invite = authed(&state, &bearer, |conn, principal| {
        invites::generate_invite(conn, principal, limit)
    })?;
    Ok((StatusCode::CREATED, Json(invite)))
}

async fn list_invites(
    State(state): State<AppState>,
    bearer: BearerToken,
) -> AppResult<Json<Vec<InviteCode>>> {
    let invites = authed(&state, &bearer, |conn, principal| {
        invites::list_invites(conn, principal)
    })?;
    Ok(Json(invites))
}
