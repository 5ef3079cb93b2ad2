use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::extractors::BearerToken;
use crate::routes::authed;
use crate::social::posts::PostView;
use crate::social::{comments, likes, posts};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/single", post(create_post).delete(delete_post))
        .route("/post/single/{id}", get(get_post))
        .route("/post/moderation", patch(moderate_post))
        .route("/comment", post(create_comment).delete(delete_comment))
        .route("/post/like", post(like_post).delete(unlike_post))
        .route("/comment/like", post(like_comment).delete(unlike_comment))
}

#[derive(Deserialize)]
struct CreatePost {
    text_content: String,
    #[serde(default)]
    images: Vec<String>,
}

async fn create_post(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<CreatePost>,
) -> AppResult<Json<Value>> {
    let post_id = authed(&state, &bearer, |conn, principal| {
        posts::create_post(conn, principal, &req.text_content, &req.images)
    })?;
    Ok(Json(json!({ "post_id": post_id })))
}

async fn get_post(
    State(state): State<AppState>,
    bearer: BearerToken,
    Path(id): Path<i64>,
) -> AppResult<Json<PostView>> {
    let view = authed(&state, &bearer, |conn, principal| {
        posts::get_post(conn, principal, id)
    })?;
    Ok(Json(view))
}

#[derive(Deserialize)]
struct PostRef {
    post_id: i64,
}

async fn delete_post(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<PostRef>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        posts::delete_post(conn, principal, req.post_id)
    })?;
    Ok(Json(json!({})))
}

#[derive(Deserialize)]
struct Moderation {
    post_id: i64,
    under_moderation: bool,
}

async fn moderate_post(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<Moderation>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        posts::set_under_moderation(conn, principal, req.post_id, req.under_moderation)
    })?;
    Ok(Json(json!({})))
}

#[derive(Deserialize)]
struct CreateComment {
    post_id: i64,
    text_content: String,
}

async fn create_comment(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<CreateComment>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let id = authed(&state, &bearer, |conn, principal| {
        comments::create_comment(conn, principal, req.post_id, &req.text_content)
    })?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Deserialize)]
struct CommentRef {
    comment_id: i64,
}

async fn delete_comment(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<CommentRef>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        comments::delete_comment(conn, principal, req.comment_id)
    })?;
    Ok(Json(json!({})))
}

async fn like_post(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<PostRef>,
) -> AppResult<(StatusCode, Json<Value>)> {
    authed(&state, &bearer, |conn, principal| {
        likes::like_post(conn, principal, req.post_id)
    })?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn unlike_post(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<PostRef>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        likes::unlike_post(conn, principal, req.post_id)
    })?;
    Ok(Json(json!({})))
}

async fn like_comment(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<CommentRef>,
) -> AppResult<(StatusCode, Json<Value>)> {
    authed(&state, &bearer, |conn, principal| {
        likes::like_comment(conn, principal, req.comment_id)
    })?;
    Ok((StatusCode::CREATED, Json(json!({}))))
}

async fn unlike_comment(
    State(state): State<AppState>,
    bearer: BearerToken,
    Json(req): Json<CommentRef>,
) -> AppResult<Json<Value>> {
    authed(&state, &bearer, |conn, principal| {
        likes::unlike_comment(conn, principal, req.comment_id)
    })?;
    Ok(Json(json!({})))
}
