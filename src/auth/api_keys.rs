use rusqlite::{params, Connection};

use crate::auth::tokens::{self, generate_token, hash_token, verify_token};
use crate::db::flags::ApiKeyPermissions;
use crate::db::models::{ApiKey, API_KEY_COLUMNS};
use crate::db::{optional, timestamp};
use crate::error::AppResult;

/// Issue a key for `owner_id`. Like session tokens, only the digest is persisted.
pub fn create_api_key(
    conn: &Connection,
    owner_id: i64,
    permissions: ApiKeyPermissions,
) -> AppResult<(String, ApiKey)> {
    let raw = generate_token();
    let key_hash = hash_token(&raw);
    let now = timestamp();

    conn.execute(
        "INSERT INTO api_keys (owner_id, key_hash, lookup_key, creation_time, permissions)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            owner_id,
            key_hash,
            tokens::lookup_key(&key_hash),
            now,
            permissions
        ],
    )?;

    let key = ApiKey {
        id: conn.last_insert_rowid(),
        owner_id,
        key_hash,
        creation_time: now,
        permissions,
    };
    Ok((raw, key))
}

pub fn resolve_api_key(conn: &Connection, presented: &str) -> AppResult<Option<ApiKey>> {
    if !tokens::is_well_formed(presented) {
        return Ok(None);
    }

    let presented_hash = hash_token(presented);
    let mut stmt = conn.prepare(&format!(
        "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE lookup_key = ?1"
    ))?;
    let candidates = stmt
        .query_map(
            params![tokens::lookup_key(&presented_hash)],
            ApiKey::from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(candidates
        .into_iter()
        .find(|key| verify_token(presented, &key.key_hash)))
}

pub fn get_api_key(conn: &Connection, key_id: i64) -> AppResult<Option<ApiKey>> {
    let key = optional(conn.query_row(
        &format!("SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = ?1"),
        params![key_id],
        ApiKey::from_row,
    ))?;
    Ok(key)
}

pub fn list_api_keys(conn: &Connection, owner_id: i64) -> AppResult<Vec<ApiKey>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE owner_id = ?1 ORDER BY id"
    ))?;
    let keys = stmt
        .query_map(params![owner_id], ApiKey::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

pub fn revoke_api_key(conn: &Connection, key_id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM api_keys WHERE id = ?1", params![key_id])?;
    Ok(())
}
