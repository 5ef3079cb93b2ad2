use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::db::flags::{AccountAttribute, AccountAttributes, ApiKeyPermissions, ReportReasons};
use crate::db::optional;

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub password_hash: String,
    pub password_salt: String,
    pub creation_time: String,
    pub birthday: Option<String>,
    pub is_legacy_account: bool,
    pub account_approved: bool,
    pub account_attributes: AccountAttributes,
    pub bio: Option<String>,
    pub totp_secret: Option<String>,
    pub last_used_totp: Option<String>,
    pub profile_pic_id: Option<i64>,
    pub header_pic_id: Option<i64>,
}

const USER_COLUMNS: &str = "id, username, display_name, password_hash, password_salt, \
     creation_time, birthday, is_legacy_account, account_approved, account_attributes, \
     bio, totp_secret, last_used_totp, profile_pic_id, header_pic_id";

impl User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            display_name: row.get(2)?,
            password_hash: row.get(3)?,
            password_salt: row.get(4)?,
            creation_time: row.get(5)?,
            birthday: row.get(6)?,
            is_legacy_account: row.get(7)?,
            account_approved: row.get(8)?,
            account_attributes: row.get(9)?,
            bio: row.get(10)?,
            totp_secret: row.get(11)?,
            last_used_totp: row.get(12)?,
            profile_pic_id: row.get(13)?,
            header_pic_id: row.get(14)?,
        })
    }

    pub fn by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Self>> {
        optional(conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            Self::from_row,
        ))
    }

    pub fn by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<Self>> {
        optional(conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            Self::from_row,
        ))
    }

    pub fn has_attribute(&self, attribute: AccountAttribute) -> bool {
        self.account_attributes.contains(attribute)
    }

    pub fn is_private(&self) -> bool {
        self.has_attribute(AccountAttribute::Private)
    }

    pub fn is_verified(&self) -> bool {
        self.has_attribute(AccountAttribute::Verified)
    }

    pub fn is_admin(&self) -> bool {
        self.has_attribute(AccountAttribute::Admin)
    }

    pub fn is_moderator(&self) -> bool {
        self.has_attribute(AccountAttribute::Moderator)
    }

    /// Instance administrators may change server-wide configuration.
    pub fn has_config_permissions(&self) -> bool {
        self.has_attribute(AccountAttribute::InstanceAdmin)
    }

    pub fn has_profile_picture(&self) -> bool {
        self.profile_pic_id.is_some()
    }

    pub fn has_header_picture(&self) -> bool {
        self.header_pic_id.is_some()
    }
}

/// Stored session. The raw access token is never part of this record.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip)]
    pub access_token_hash: String,
    pub creation_ip: String,
    pub user_agent: String,
    pub creation_time: String,
    pub last_access_time: String,
}

pub(crate) const SESSION_COLUMNS: &str =
    "id, user_id, access_token_hash, creation_ip, user_agent, creation_time, last_access_time";

impl Session {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            access_token_hash: row.get(2)?,
            creation_ip: row.get(3)?,
            user_agent: row.get(4)?,
            creation_time: row.get(5)?,
            last_access_time: row.get(6)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKey {
    pub id: i64,
    pub owner_id: i64,
    #[serde(skip)]
    pub key_hash: String,
    pub creation_time: String,
    pub permissions: ApiKeyPermissions,
}

pub(crate) const API_KEY_COLUMNS: &str = "id, owner_id, key_hash, creation_time, permissions";

impl ApiKey {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            key_hash: row.get(2)?,
            creation_time: row.get(3)?,
            permissions: row.get(4)?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub text: String,
    pub creation_time: String,
    pub under_moderation: bool,
}

impl Post {
    pub fn by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Self>> {
        optional(conn.query_row(
            "SELECT id, user_id, text, creation_time, under_moderation FROM posts WHERE id = ?1",
            params![id],
            |row| {
                Ok(Self {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    text: row.get(2)?,
                    creation_time: row.get(3)?,
                    under_moderation: row.get(4)?,
                })
            },
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub user_id: i64,
    pub post_id: i64,
    pub text: String,
    pub creation_time: String,
}

impl Comment {
    pub fn by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Self>> {
        optional(conn.query_row(
            "SELECT id, user_id, post_id, text, creation_time FROM comments WHERE id = ?1",
            params![id],
            |row| {
                Ok(Self {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    post_id: row.get(2)?,
                    text: row.get(3)?,
                    creation_time: row.get(4)?,
                })
            },
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Image {
    #[serde(skip)]
    pub id: i64,
    pub uploader_id: i64,
    pub identifier: String,
    pub creation_time: String,
}

impl Image {
    pub fn by_identifier(conn: &Connection, identifier: &str) -> rusqlite::Result<Option<Self>> {
        optional(conn.query_row(
            "SELECT id, uploader_id, identifier, creation_time FROM images WHERE identifier = ?1",
            params![identifier],
            |row| {
                Ok(Self {
                    id: row.get(0)?,
                    uploader_id: row.get(1)?,
                    identifier: row.get(2)?,
                    creation_time: row.get(3)?,
                })
            },
        ))
    }

    /// True when no post, profile picture or header picture refers to this image.
    pub fn is_orphan(&self, conn: &Connection) -> rusqlite::Result<bool> {
        conn.query_row(
            "SELECT NOT EXISTS (SELECT 1 FROM post_images WHERE image_id = ?1)
                AND NOT EXISTS (SELECT 1 FROM users WHERE profile_pic_id = ?1)
                AND NOT EXISTS (SELECT 1 FROM users WHERE header_pic_id = ?1)",
            params![self.id],
            |row| row.get(0),
        )
    }
}

/// Lifecycle of a report. Reports are never deleted on their own; they disappear only
/// when the reported post does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportState {
    Active,
    Resolved,
}

impl ReportState {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportState::Active => "active",
            ReportState::Resolved => "resolved",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ReportState::Active),
            "resolved" => Some(ReportState::Resolved),
            _ => None,
        }
    }
}

impl rusqlite::types::ToSql for ReportState {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl rusqlite::types::FromSql for ReportState {
    fn column_result(
        value: rusqlite::types::ValueRef<'_>,
    ) -> rusqlite::types::FromSqlResult<Self> {
        let text = value.as_str()?;
        Self::parse(text).ok_or(rusqlite::types::FromSqlError::InvalidType)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub id: i64,
    pub post_id: i64,
    /// Empty once the reporting account has been deleted.
    pub reporter_id: Option<i64>,
    pub state: ReportState,
    pub report_reasons: ReportReasons,
    pub supplementary_info: Option<String>,
    pub creation_time: String,
}

impl Report {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            post_id: row.get(1)?,
            reporter_id: row.get(2)?,
            state: row.get(3)?,
            report_reasons: row.get(4)?,
            supplementary_info: row.get(5)?,
            creation_time: row.get(6)?,
        })
    }

    pub fn by_id(conn: &Connection, id: i64) -> rusqlite::Result<Option<Self>> {
        optional(conn.query_row(
            "SELECT id, post_id, reporter_id, state, report_reasons, supplementary_info,
                    creation_time
             FROM post_reports WHERE id = ?1",
            params![id],
            Self::from_row,
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteCode {
    #[serde(skip)]
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub used: bool,
    pub creation_time: String,
}
