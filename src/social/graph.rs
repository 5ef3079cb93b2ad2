use rusqlite::{params, Connection};

use crate::auth::Principal;
use crate::db::flags::ApiKeyPermission;
use crate::db::models::User;
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};

pub fn is_following(conn: &Connection, follower_id: i64, followed_id: i64) -> AppResult<bool> {
    let found = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = ?1 AND following_id = ?2)",
        params![follower_id, followed_id],
        |row| row.get(0),
    )?;
    Ok(found)
}

pub fn is_blocking(conn: &Connection, blocker_id: i64, blocked_id: i64) -> AppResult<bool> {
    let found = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM blocks WHERE user_id = ?1 AND blocking_id = ?2)",
        params![blocker_id, blocked_id],
        |row| row.get(0),
    )?;
    Ok(found)
}

/// True when either user blocks the other.
pub fn blocked_between(conn: &Connection, a: i64, b: i64) -> AppResult<bool> {
    Ok(is_blocking(conn, a, b)? || is_blocking(conn, b, a)?)
}

fn target_user(conn: &Connection, username: &str) -> AppResult<User> {
    User::by_username(conn, username)?.ok_or(AppError::NotFound(ErrorCode::UserNotFound))
}

pub fn follow(conn: &Connection, principal: &Principal, username: &str) -> AppResult<()> {
    principal.require(ApiKeyPermission::Social)?;
    let target = target_user(conn, username)?;

    if target.id == principal.user_id() {
        return Err(AppError::Validation(ErrorCode::CannotFollowSelf));
    }
    if blocked_between(conn, principal.user_id(), target.id)? {
        return Err(AppError::Validation(ErrorCode::UserBlocked));
    }
    if is_following(conn, principal.user_id(), target.id)? {
        return Err(AppError::Conflict(ErrorCode::AlreadyFollowing));
    }

    conn.execute(
        "INSERT INTO follows (user_id, following_id, creation_time) VALUES (?1, ?2, ?3)",
        params![principal.user_id(), target.id, timestamp()],
    )?;
    Ok(())
}

pub fn unfollow(conn: &Connection, principal: &Principal, username: &str) -> AppResult<()> {
    principal.require(ApiKeyPermission::Social)?;
    let target = target_user(conn, username)?;

    let removed = conn.execute(
        "DELETE FROM follows WHERE user_id = ?1 AND following_id = ?2",
        params![principal.user_id(), target.id],
    )?;
    if removed == 0 {
        return Err(AppError::NotFound(ErrorCode::FollowNotFound));
    }
    Ok(())
}

/// Block a user. Follows in both directions are dropped along with it.
pub fn block(conn: &Connection, principal: &Principal, username: &str) -> AppResult<()> {
    principal.require(ApiKeyPermission::Social)?;
    let target = target_user(conn, username)?;

    if target.id == principal.user_id() {
        return Err(AppError::Validation(ErrorCode::CannotBlockSelf));
    }
    if is_blocking(conn, principal.user_id(), target.id)? {
        return Err(AppError::Conflict(ErrorCode::AlreadyBlocked));
    }

    conn.execute(
        "INSERT INTO blocks (user_id, blocking_id, creation_time) VALUES (?1, ?2, ?3)",
        params![principal.user_id(), target.id, timestamp()],
    )?;
    conn.execute(
        "DELETE FROM follows
         WHERE (user_id = ?1 AND following_id = ?2) OR (user_id = ?2 AND following_id = ?1)",
        params![principal.user_id(), target.id],
    )?;
    Ok(())
}

pub fn unblock(conn: &Connection, principal: &Principal, username: &str) -> AppResult<()> {
    principal.require(ApiKeyPermission::Social)?;
    let target = target_user(conn, username)?;

    let removed = conn.execute(
        "DELETE FROM blocks WHERE user_id = ?1 AND blocking_id = ?2",
        params![principal.user_id(), target.id],
    )?;
    if removed == 0 {
        return Err(AppError::NotFound(ErrorCode::BlockNotFound));
    }
    Ok(())
}
