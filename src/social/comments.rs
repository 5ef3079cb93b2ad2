use rusqlite::{params, Connection};

use crate::auth::{ensure_owner, Principal};
use crate::db::flags::ApiKeyPermission;
use crate::db::models::Comment;
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::social::{char_len, normalize_text, posts, COMMENT_MAX_LEN};

/// Normalise and length-check comment text.
pub fn validate_comment_text(text: &str) -> AppResult<String> {
    let text = normalize_text(text);
    if char_len(&text) > COMMENT_MAX_LEN {
        return Err(AppError::Validation(ErrorCode::CommentTooLong));
    }
    if text.is_empty() {
        return Err(AppError::Validation(ErrorCode::CommentTooShort));
    }
    Ok(text)
}

pub fn create_comment(
    conn: &Connection,
    principal: &Principal,
    post_id: i64,
    text: &str,
) -> AppResult<i64> {
    principal.require(ApiKeyPermission::Comment)?;
    let post = posts::visible_post(conn, principal, post_id)?;
    let text = validate_comment_text(text)?;

    conn.execute(
        "INSERT INTO comments (user_id, post_id, text, creation_time) VALUES (?1, ?2, ?3, ?4)",
        params![principal.user_id(), post.id, text, timestamp()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn delete_comment(conn: &Connection, principal: &Principal, comment_id: i64) -> AppResult<()> {
    principal.require(ApiKeyPermission::Comment)?;
    let comment = Comment::by_id(conn, comment_id)?
        .ok_or(AppError::NotFound(ErrorCode::CommentNotFound))?;
    ensure_owner(comment.user_id, principal)?;

    conn.execute("DELETE FROM comments WHERE id = ?1", params![comment.id])?;
    Ok(())
}
