use rusqlite::{params, Connection};
use serde::Serialize;

use crate::auth::Principal;
use crate::db::flags::ApiKeyPermission;
use crate::db::models::{Post, User};
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::social::{char_len, graph, images, normalize_text, POST_MAX_LEN, TAG_MAX_LEN};

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: i64,
    pub author: String,
    pub text: String,
    pub creation_time: String,
    pub images: Vec<String>,
    pub hashtags: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub liked_by_viewer: bool,
}

/// Distinct `#tags` in order of first appearance, lowercased.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for word in text.split_whitespace() {
        let Some(rest) = word.strip_prefix('#') else {
            continue;
        };
        let tag: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect::<String>()
            .to_lowercase();
        if tag.is_empty() || char_len(&tag) > TAG_MAX_LEN || tags.contains(&tag) {
            continue;
        }
        tags.push(tag);
    }
    tags
}

fn attach_hashtag(conn: &Connection, post_id: i64, name: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO hashtags (name, creation_time) VALUES (?1, ?2)",
        params![name, timestamp()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO post_hashtags (post_id, hashtag_id)
         SELECT ?1, id FROM hashtags WHERE name = ?2",
        params![post_id, name],
    )?;
    Ok(())
}

/// Create a post from `text` with any of the principal's own images attached.
pub fn create_post(
    conn: &Connection,
    principal: &Principal,
    text: &str,
    image_identifiers: &[String],
) -> AppResult<i64> {
    principal.require(ApiKeyPermission::Post)?;

    let text = normalize_text(text);
    if text.is_empty() {
        return Err(AppError::Validation(ErrorCode::PostTooShort));
    }
    if char_len(&text) > POST_MAX_LEN {
        return Err(AppError::Validation(ErrorCode::PostTooLong));
    }

    let attached = image_identifiers
        .iter()
        .map(|identifier| images::owned_image(conn, principal, identifier))
        .collect::<AppResult<Vec<_>>>()?;

    conn.execute(
        "INSERT INTO posts (user_id, text, creation_time) VALUES (?1, ?2, ?3)",
        params![principal.user_id(), text, timestamp()],
    )?;
    let post_id = conn.last_insert_rowid();

    for (position, image) in attached.iter().enumerate() {
        conn.execute(
            "INSERT OR IGNORE INTO post_images (post_id, image_id, position) VALUES (?1, ?2, ?3)",
            params![post_id, image.id, position as i64],
        )?;
    }
    for tag in extract_hashtags(&text) {
        attach_hashtag(conn, post_id, &tag)?;
    }

    Ok(post_id)
}

/// Whether `viewer` may see `post`. Blocks in either direction hide it, private
/// authors are visible only to followers, and moderated posts only to their author and
/// moderators.
pub fn can_view(conn: &Connection, viewer: &Principal, post: &Post) -> AppResult<bool> {
    if post.user_id == viewer.user_id() {
        return Ok(true);
    }
    if graph::blocked_between(conn, post.user_id, viewer.user_id())? {
        return Ok(false);
    }
    if post.under_moderation && viewer.require_moderator().is_err() {
        return Ok(false);
    }

    let author = User::by_id(conn, post.user_id)?
        .ok_or(AppError::NotFound(ErrorCode::PostNotFound))?;
    if author.is_private() && !graph::is_following(conn, viewer.user_id(), author.id)? {
        return Ok(false);
    }
    Ok(true)
}

/// A post the viewer is allowed to see. Hidden posts are indistinguishable from missing ones.
pub fn visible_post(conn: &Connection, viewer: &Principal, post_id: i64) -> AppResult<Post> {
    let post = Post::by_id(conn, post_id)?.ok_or(AppError::NotFound(ErrorCode::PostNotFound))?;
    if !can_view(conn, viewer, &post)? {
        return Err(AppError::NotFound(ErrorCode::PostNotFound));
    }
    Ok(post)
}

pub fn get_post(conn: &Connection, viewer: &Principal, post_id: i64) -> AppResult<PostView> {
    viewer.require(ApiKeyPermission::Read)?;
    let post = visible_post(conn, viewer, post_id)?;

    let author: String = conn.query_row(
        "SELECT username FROM users WHERE id = ?1",
        params![post.user_id],
        |row| row.get(0),
    )?;

    let images = {
        let mut stmt = conn.prepare(
            "SELECT i.identifier FROM post_images p JOIN images i ON i.id = p.image_id
             WHERE p.post_id = ?1 ORDER BY p.position",
        )?;
        let rows = stmt.query_map(params![post.id], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>()?
    };

    let hashtags = {
        let mut stmt = conn.prepare(
            "SELECT h.name FROM post_hashtags p JOIN hashtags h ON h.id = p.hashtag_id
             WHERE p.post_id = ?1 ORDER BY h.name",
        )?;
        let rows = stmt.query_map(params![post.id], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>()?
    };

    let (like_count, comment_count, liked_by_viewer) = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM post_likes WHERE post_id = ?1),
                (SELECT COUNT(*) FROM comments WHERE post_id = ?1),
                EXISTS (SELECT 1 FROM post_likes WHERE post_id = ?1 AND user_id = ?2)",
        params![post.id, viewer.user_id()],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(PostView {
        id: post.id,
        author,
        text: post.text,
        creation_time: post.creation_time,
        images,
        hashtags,
        like_count,
        comment_count,
        liked_by_viewer,
    })
}

/// Put a post under moderation, hiding it from everyone but its author and
/// moderators, or release it again.
pub fn set_under_moderation(
    conn: &Connection,
    principal: &Principal,
    post_id: i64,
    under_moderation: bool,
) -> AppResult<()> {
    principal.require_moderator()?;
    let post = Post::by_id(conn, post_id)?.ok_or(AppError::NotFound(ErrorCode::PostNotFound))?;

    conn.execute(
        "UPDATE posts SET under_moderation = ?1 WHERE id = ?2",
        params![under_moderation, post.id],
    )?;
    tracing::info!(
        "Moderator {} set moderation of post {} to {}",
        principal.user_id(),
        post.id,
        under_moderation
    );
    Ok(())
}

/// Delete a post. Authors may delete their own; moderators may delete any post, and
/// that override is logged.
pub fn delete_post(conn: &Connection, principal: &Principal, post_id: i64) -> AppResult<()> {
    principal.require(ApiKeyPermission::Post)?;
    let post = Post::by_id(conn, post_id)?.ok_or(AppError::NotFound(ErrorCode::PostNotFound))?;

    if post.user_id != principal.user_id() {
        if principal.require_moderator().is_err() {
            return Err(AppError::Unauthorized(ErrorCode::ObjectNotOwnedByUser));
        }
        tracing::info!(
            "Moderator {} deleted post {} by user {}",
            principal.user_id(),
            post.id,
            post.user_id
        );
    }

    conn.execute("DELETE FROM posts WHERE id = ?1", params![post.id])?;
    Ok(())
}
