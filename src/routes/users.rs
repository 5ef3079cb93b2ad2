use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::db;
use crate::db::flags::AccountAttributes;
use crate::error::AppResult;
use crate::extractors::BearerToken;
use crate::routes::{authed, in_request};
use crate::social::users::{self, NewUser, Profile, ProfileUpdate};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/user",
            post(create_user).patch(update_profile).delete(delete_user),
        )
        .route("/user/{username}", get(get_profile))
        .route("/user/available/{username}", get(username_available))
        .route("/user/password", patch(change_password))
        .route("/admin/user/approve", patch(approve_user))
        .route("/admin/user/attributes", patch(set_attributes))
}

async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<NewUser>,
) -> AppResult<(StatusCode, Json<Value>)> {
    db::transaction(&state.db, |conn| {
        users::create_user(
            conn,
            &state.hasher,
            &state.config.auth,
            &state.config.accounts,
            &req,
        )
    })?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn get_profile(
    State(state): State<AppState>,
    bearer: BearerToken,
    Path(username): Path<String>,
) -> AppResult<Json<Profile>> {
    let profile = in_request(&state, |conn| {
        let viewer = state.resolver.optional(conn, bearer.as_deref())?;
        users::get_profile(conn, viewer.as_ref(), &username)
    })?;
    Ok(Json(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<ProfileUpdate>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        users::update_profile(conn, principal, &req)
    })?;
    Ok(Json(json!({})))
}

#[derive(Deserialize)]
struct PasswordConfirmation {
    password: String,
}

async fn delete_user(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<PasswordConfirmation>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        users::delete_user(conn, &state.hasher, principal, &req.password)
    })?;
    Ok(Json(json!({})))
}

async fn username_available(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let available = users::username_available(&conn, &username)?;
    Ok(Json(json!({ "available": available })))
}

#[derive(Deserialize)]
struct PasswordChange {
    old_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<PasswordChange>,
) -> AppResult<(StatusCode, Json<Value>)> {
    authed(&state, &bearer, |conn, principal| {
        users::change_password(
            conn,
            &state.hasher,
            &state.config.auth,
            principal,
            &req.old_password,
            &req.new_password,
        )
    })?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

#[derive(Deserialize)]
struct UsernameRequest {
    username: String,
}

async fn approve_user(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<UsernameRequest>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        users::approve_user(conn, principal, &req.username)
    })?;
    Ok(Json(json!({})))
}

#[derive(Deserialize)]
struct AttributeChange {
    username: String,
    #[serde(default)]
    grant: AccountAttributes,
    #[serde(default)]
    revoke: AccountAttributes,
}

async fn set_attributes(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<AttributeChange>,
) -> AppResult<Json<Value>> {
    let attributes = authed(&state, &bearer, |conn, principal| {
        users::set_attributes(conn, principal, &req.username, req.grant, req.revoke)
    })?;
    Ok(Json(json!({ "attributes": attributes })))
}
