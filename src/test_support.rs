//! Fixtures shared by unit tests.

use rusqlite::{params, Connection};

use crate::auth::{Credential, CredentialHasher, Principal};
use crate::db::flags::{AccountAttribute, ApiKeyPermission};
use crate::db::models::User;
use crate::db::{create_memory_pool, run_migrations, timestamp};
use crate::state::DbPool;

pub fn test_pool() -> DbPool {
    let pool = create_memory_pool().unwrap();
    run_migrations(&pool).unwrap();
    pool
}

/// Cheap Argon2 parameters so tests don't spend their time hashing.
pub fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(64, 1).unwrap()
}

/// Insert an approved user with placeholder credentials.
pub fn insert_user(conn: &Connection, username: &str) -> User {
    conn.execute(
        "INSERT INTO users (username, display_name, password_hash, password_salt, creation_time)
         VALUES (?1, ?1, 'hash', 'salt', ?2)",
        params![username, timestamp()],
    )
    .unwrap();
    User::by_username(conn, username).unwrap().unwrap()
}

pub fn grant(conn: &Connection, user: &User, attributes: &[AccountAttribute]) -> User {
    let mut set = user.account_attributes;
    for attribute in attributes {
        set.insert(*attribute);
    }
    conn.execute(
        "UPDATE users SET account_attributes = ?1 WHERE id = ?2",
        params![set, user.id],
    )
    .unwrap();
    User::by_id(conn, user.id).unwrap().unwrap()
}

/// Detached user value for predicate tests that never touch the database.
pub fn user_with(id: i64, attributes: &[AccountAttribute]) -> User {
    User {
        id,
        username: format!("user{id}"),
        display_name: format!("User {id}"),
        password_hash: String::new(),
        password_salt: String::new(),
        creation_time: timestamp(),
        birthday: None,
        is_legacy_account: false,
        account_approved: true,
        account_attributes: attributes.into(),
        bio: None,
        totp_secret: None,
        last_used_totp: None,
        profile_pic_id: None,
        header_pic_id: None,
    }
}

/// Principal acting through a session.
pub fn acting(user: User) -> Principal {
    Principal {
        user,
        credential: Credential::Session { session_id: 0 },
    }
}

/// Principal acting through an API key holding exactly `permissions`.
pub fn acting_with_key(user: User, permissions: &[ApiKeyPermission]) -> Principal {
    Principal {
        user,
        credential: Credential::ApiKey {
            key_id: 0,
            permissions: permissions.into(),
        },
    }
}
