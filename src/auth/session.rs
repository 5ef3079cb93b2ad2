use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection};

use crate::auth::tokens::{self, generate_token, hash_token, verify_token};
use crate::db::models::{Session, SESSION_COLUMNS};
use crate::db::{optional, timestamp};
use crate::error::AppResult;

/// Create a new session for a user. Returns the raw token, which is not stored and
/// cannot be recovered later, alongside the persisted record.
pub fn create_session(
    conn: &Connection,
    user_id: i64,
    client_ip: &str,
    user_agent: &str,
) -> AppResult<(String, Session)> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let now = timestamp();

    conn.execute(
        "INSERT INTO user_sessions
            (user_id, access_token_hash, lookup_key, creation_ip, user_agent,
             creation_time, last_access_time)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
        params![
            user_id,
            token_hash,
            tokens::lookup_key(&token_hash),
            client_ip,
            user_agent,
            now
        ],
    )?;

    let session = Session {
        id: conn.last_insert_rowid(),
        user_id,
        access_token_hash: token_hash,
        creation_ip: client_ip.to_string(),
        user_agent: user_agent.to_string(),
        creation_time: now.clone(),
        last_access_time: now,
    };

    Ok((token, session))
}

fn is_expired(session: &Session, idle_timeout: Duration, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(&session.last_access_time) {
        Ok(last_access) => last_access.with_timezone(&Utc) + idle_timeout < now,
        // unreadable timestamps can't prove the session is fresh
        Err(_) => true,
    }
}

/// Find the session for a presented token and record the access.
///
/// Unknown, malformed and expired tokens all come back as `None`. Expired sessions are
/// deleted as they are found.
pub fn resolve_session(
    conn: &Connection,
    presented: &str,
    idle_timeout: Duration,
) -> AppResult<Option<Session>> {
    if !tokens::is_well_formed(presented) {
        return Ok(None);
    }

    let presented_hash = hash_token(presented);
    let candidates: Vec<Session> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {SESSION_COLUMNS} FROM user_sessions WHERE lookup_key = ?1"
        ))?;
        let rows = stmt.query_map(
            params![tokens::lookup_key(&presented_hash)],
            Session::from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let Some(mut session) = candidates
        .into_iter()
        .find(|candidate| verify_token(presented, &candidate.access_token_hash))
    else {
        return Ok(None);
    };

    if is_expired(&session, idle_timeout, Utc::now()) {
        tracing::info!("Session {} expired for user {}", session.id, session.user_id);
        revoke_session(conn, session.id)?;
        return Ok(None);
    }

    // last access only moves forward, even if the wall clock steps back
    let now = timestamp();
    conn.execute(
        "UPDATE user_sessions SET last_access_time = MAX(last_access_time, ?1) WHERE id = ?2",
        params![now, session.id],
    )?;
    if now > session.last_access_time {
        session.last_access_time = now;
    }

    Ok(Some(session))
}

/// Delete a session. Revoking a session that is already gone is not an error; callers
/// check ownership before getting here.
pub fn revoke_session(conn: &Connection, session_id: i64) -> AppResult<()> {
    conn.execute(
        "DELETE FROM user_sessions WHERE id = ?1",
        params![session_id],
    )?;
    Ok(())
}

/// Delete every session idle for longer than `idle_timeout`. Returns how many were
/// removed.
pub fn purge_expired_sessions(conn: &Connection, idle_timeout: Duration) -> AppResult<usize> {
    let cutoff = (Utc::now() - idle_timeout).to_rfc3339_opts(SecondsFormat::Micros, true);
    let removed = conn.execute(
        "DELETE FROM user_sessions WHERE last_access_time < ?1",
        params![cutoff],
    )?;
    if removed > 0 {
        tracing::info!("Purged {} expired sessions", removed);
    }
    Ok(removed)
}

/// Delete every session of `user_id` except `keep`. Returns how many were removed.
pub fn revoke_user_sessions(
    conn: &Connection,
    user_id: i64,
    keep: Option<i64>,
) -> AppResult<usize> {
    let removed = conn.execute(
        "DELETE FROM user_sessions WHERE user_id = ?1 AND id IS NOT ?2",
        params![user_id, keep],
    )?;
    Ok(removed)
}

pub fn get_session(conn: &Connection, session_id: i64) -> AppResult<Option<Session>> {
    let session = optional(conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM user_sessions WHERE id = ?1"),
        params![session_id],
        Session::from_row,
    ))?;
    Ok(session)
}

pub fn list_sessions(conn: &Connection, user_id: i64) -> AppResult<Vec<Session>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM user_sessions WHERE user_id = ?1
         ORDER BY last_access_time DESC"
    ))?;
    let sessions = stmt
        .query_map(params![user_id], Session::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sessions)
}
