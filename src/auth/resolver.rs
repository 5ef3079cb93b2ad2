use axum::http::{header, HeaderMap};
use chrono::Duration;
use rusqlite::Connection;

use crate::auth::principal::{Credential, Principal};
use crate::auth::{api_keys, session};
use crate::db::models::User;
use crate::error::{AppError, AppResult, ErrorCode};

const MAX_IDLE_HOURS: u64 = 24 * 365 * 100;

/// Outcome of looking at a request's credentials.
#[derive(Debug)]
pub enum AuthState {
    /// No credential was presented.
    Unauthenticated,
    Authenticated(Principal),
    Rejected(ErrorCode),
}

/// Pull the token out of `Authorization: Bearer <token>`. The scheme is matched
/// case-insensitively.
pub fn extract_bearer(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Turns presented bearer credentials into a [`Principal`]. Runs on the request's
/// transaction so credential checks and the work they guard see the same state.
#[derive(Debug, Clone)]
pub struct AuthorizationResolver {
    session_idle_timeout: Duration,
}

impl AuthorizationResolver {
    pub fn new(session_idle_hours: u64) -> Self {
        // chrono panics past its range; a century is "never" for a session
        let hours = session_idle_hours.min(MAX_IDLE_HOURS) as i64;
        Self {
            session_idle_timeout: Duration::hours(hours),
        }
    }

    pub fn resolve(&self, conn: &Connection, bearer: Option<&str>) -> AppResult<AuthState> {
        let Some(token) = bearer else {
            return Ok(AuthState::Unauthenticated);
        };

        if let Some(session) = session::resolve_session(conn, token, self.session_idle_timeout)? {
            return Self::principal_for(
                conn,
                session.user_id,
                Credential::Session {
                    session_id: session.id,
                },
            );
        }

        if let Some(key) = api_keys::resolve_api_key(conn, token)? {
            return Self::principal_for(
                conn,
                key.owner_id,
                Credential::ApiKey {
                    key_id: key.id,
                    permissions: key.permissions,
                },
            );
        }

        tracing::warn!("Rejected unrecognised bearer credential");
        Ok(AuthState::Rejected(ErrorCode::TokenInvalid))
    }

    fn principal_for(conn: &Connection, user_id: i64, credential: Credential) -> AppResult<AuthState> {
        // the FK cascade removes credentials with their user, so a miss means corruption
        let user = User::by_id(conn, user_id)?.ok_or_else(|| {
            AppError::Internal(format!("Credential refers to missing user {user_id}"))
        })?;

        if !user.account_approved {
            return Ok(AuthState::Rejected(ErrorCode::AccountNotApproved));
        }

        Ok(AuthState::Authenticated(Principal { user, credential }))
    }

    /// Delete sessions past the idle timeout. Called on its own transaction, since a
    /// rejected request rolls back the deletes made while resolving it.
    pub fn purge_expired(&self, conn: &Connection) -> AppResult<usize> {
        session::purge_expired_sessions(conn, self.session_idle_timeout)
    }

    /// Resolve, treating anything but a valid credential as an authentication failure.
    pub fn require(&self, conn: &Connection, bearer: Option<&str>) -> AppResult<Principal> {
        match self.resolve(conn, bearer)? {
            AuthState::Authenticated(principal) => Ok(principal),
            AuthState::Unauthenticated => Err(AppError::Unauthenticated(
                ErrorCode::AuthenticationRequired,
            )),
            AuthState::Rejected(code) => Err(AppError::Unauthenticated(code)),
        }
    }

    /// Resolve for routes that also serve anonymous callers. A presented but invalid
    /// credential is still an error.
    pub fn optional(&self, conn: &Connection, bearer: Option<&str>) -> AppResult<Option<Principal>> {
        match self.resolve(conn, bearer)? {
            AuthState::Authenticated(principal) => Ok(Some(principal)),
            AuthState::Unauthenticated => Ok(None),
            AuthState::Rejected(code) => Err(AppError::Unauthenticated(code)),
        }
    }
}
