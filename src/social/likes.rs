use rusqlite::{params, Connection};

use crate::auth::Principal;
use crate::db::flags::ApiKeyPermission;
use crate::db::models::Comment;
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::social::posts;

/// Table and target column for each likeable entity.
#[derive(Debug, Clone, Copy)]
enum Target {
    Post,
    Comment,
}

impl Target {
    fn table(self) -> &'static str {
        match self {
            Target::Post => "post_likes",
            Target::Comment => "comment_likes",
        }
    }

    fn column(self) -> &'static str {
        match self {
            Target::Post => "post_id",
            Target::Comment => "comment_id",
        }
    }
}

fn insert_like(conn: &Connection, target: Target, user_id: i64, target_id: i64) -> AppResult<()> {
    let exists: bool = conn.query_row(
        &format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = ?1 AND {} = ?2)",
            target.table(),
            target.column()
        ),
        params![user_id, target_id],
        |row| row.get(0),
    )?;
    if exists {
        return Err(AppError::Conflict(ErrorCode::AlreadyLiked));
    }

    conn.execute(
        &format!(
            "INSERT INTO {} (user_id, {}, creation_time) VALUES (?1, ?2, ?3)",
            target.table(),
            target.column()
        ),
        params![user_id, target_id, timestamp()],
    )?;
    Ok(())
}

fn delete_like(conn: &Connection, target: Target, user_id: i64, target_id: i64) -> AppResult<()> {
    let removed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE user_id = ?1 AND {} = ?2",
            target.table(),
            target.column()
        ),
        params![user_id, target_id],
    )?;
    if removed == 0 {
        return Err(AppError::NotFound(ErrorCode::LikeNotFound));
    }
    Ok(())
}

fn visible_comment(conn: &Connection, principal: &Principal, comment_id: i64) -> AppResult<Comment> {
    let comment = Comment::by_id(conn, comment_id)?
        .ok_or(AppError::NotFound(ErrorCode::CommentNotFound))?;
    posts::visible_post(conn, principal, comment.post_id)?;
    Ok(comment)
}

pub fn like_post(conn: &Connection, principal: &Principal, post_id: i64) -> AppResult<()> {
    principal.require(ApiKeyPermission::Like)?;
    let post = posts::visible_post(conn, principal, post_id)?;
    insert_like(conn, Target::Post, principal.user_id(), post.id)
}

pub fn unlike_post(conn: &Connection, principal: &Principal, post_id: i64) -> AppResult<()> {
    principal.require(ApiKeyPermission::Like)?;
    delete_like(conn, Target::Post, principal.user_id(), post_id)
}

pub fn like_comment(conn: &Connection, principal: &Principal, comment_id: i64) -> AppResult<()> {
    principal.require(ApiKeyPermission::Like)?;
    let comment = visible_comment(conn, principal, comment_id)?;
    insert_like(conn, Target::Comment, principal.user_id(), comment.id)
}

pub fn unlike_comment(conn: &Connection, principal: &Principal, comment_id: i64) -> AppResult<()> {
    principal.require(ApiKeyPermission::Like)?;
    delete_like(conn, Target::Comment, principal.user_id(), comment_id)
}
