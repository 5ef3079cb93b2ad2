use rusqlite::{params, Connection};

use crate::auth::tokens::generate_token;
use crate::auth::Principal;
use crate::db::flags::ApiKeyPermission;
use crate::db::models::InviteCode;
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};

/// Issue a one-time invite code. At most `limit` unused codes may be outstanding per user.
pub fn generate_invite(conn: &Connection, principal: &Principal, limit: u32) -> AppResult<InviteCode> {
    principal.require(ApiKeyPermission::Invite)?;

    let outstanding: u32 = conn.query_row(
        "SELECT COUNT(*) FROM invite_codes WHERE user_id = ?1 AND used = 0",
        params![principal.user_id()],
        |row| row.get(0),
    )?;
    if outstanding >= limit {
        return Err(AppError::Validation(ErrorCode::InviteCodeLimitReached));
    }

    let invite = InviteCode {
        id: 0,
        user_id: principal.user_id(),
        code: generate_token(),
        used: false,
        creation_time: timestamp(),
    };
    conn.execute(
        "INSERT INTO invite_codes (user_id, code, used, creation_time) VALUES (?1, ?2, 0, ?3)",
        params![invite.user_id, invite.code, invite.creation_time],
    )?;
    tracing::info!("User {} generated an invite code", invite.user_id);

    Ok(InviteCode {
        id: conn.last_insert_rowid(),
        ..invite
    })
}

pub fn list_invites(conn: &Connection, principal: &Principal) -> AppResult<Vec<InviteCode>> {
    principal.require(ApiKeyPermission::Invite)?;

    let mut stmt = conn.prepare(
        "SELECT id, user_id, code, used, creation_time FROM invite_codes
         WHERE user_id = ?1 ORDER BY id",
    )?;
    let invites = stmt
        .query_map(params![principal.user_id()], |row| {
            Ok(InviteCode {
                id: row.get(0)?,
                user_id: row.get(1)?,
                code: row.get(2)?,
                used: row.get(3)?,
                creation_time: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(invites)
}

/// Mark a code as used. Unknown and already-used codes are both invalid.
pub fn redeem_invite(conn: &Connection, code: &str) -> AppResult<()> {
    let updated = conn.execute(
        "UPDATE invite_codes SET used = 1 WHERE code = ?1 AND used = 0",
        params![code],
    )?;
    if updated == 0 {
        return Err(AppError::Validation(ErrorCode::InviteCodeInvalid));
    }
    Ok(())
}
