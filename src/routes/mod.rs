pub mod images;
pub mod keys;
pub mod posts;
pub mod reports;
pub mod sessions;
pub mod social;
pub mod users;

use axum::Router;
use rusqlite::Connection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Principal;
use crate::db;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::extractors::BearerToken;
use crate::state::AppState;

/// The full API, mounted under `/api/v3`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(users::router())
        .merge(sessions::router())
        .merge(posts::router())
        .merge(social::router())
        .merge(reports::router())
        .merge(images::router())
        .merge(keys::router());

    Router::new()
        .nest("/api/v3", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Run `f` in the request's transaction. A request rejected for a bad token rolls back,
/// so expired sessions found while resolving it are purged afterwards.
pub(crate) fn in_request<T, F>(state: &AppState, f: F) -> AppResult<T>
where
    F: FnOnce(&Connection) -> AppResult<T>,
{
    let result = db::transaction(&state.db, f);
    if matches!(result, Err(AppError::Unauthenticated(ErrorCode::TokenInvalid))) {
        if let Err(err) = db::transaction(&state.db, |conn| state.resolver.purge_expired(conn)) {
            tracing::warn!("Failed to purge expired sessions: {}", err);
        }
    }
    result
}

/// Run `f` for an authenticated principal. Credential resolution and the operation
/// share one transaction.
pub(crate) fn authed<T, F>(state: &AppState, bearer: &BearerToken, f: F) -> AppResult<T>
where
    F: FnOnce(&Connection, &Principal) -> AppResult<T>,
{
    in_request(state, |conn| {
        let principal = state.resolver.require(conn, bearer.as_deref())?;
        f(conn, &principal)
    })
}
