use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use crate::auth::session::{create_session, revoke_user_sessions};
use crate::auth::{CredentialHasher, Principal};
use crate::config::{AccountsConfig, AuthConfig};
use crate::db::flags::{AccountAttribute, AccountAttributes, ApiKeyPermission};
use crate::db::models::{Image, User};
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::social::{
    char_len, graph, images, invites, BIO_MAX_LEN, DISPLAY_NAME_MAX_LEN, USERNAME_MAX_LEN,
};

/// Usernames are 1 to `USERNAME_MAX_LEN` ASCII letters, digits or underscores.
pub fn validate_username(username: &str) -> AppResult<()> {
    let valid = !username.is_empty()
        && username.len() <= USERNAME_MAX_LEN
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(ErrorCode::UsernameInvalid))
    }
}

pub fn validate_display_name(display_name: &str) -> AppResult<String> {
    let display_name = display_name.trim();
    if display_name.is_empty() || char_len(display_name) > DISPLAY_NAME_MAX_LEN {
        return Err(AppError::Validation(ErrorCode::DisplayNameInvalid));
    }
    Ok(display_name.to_string())
}

pub fn validate_password(password: &str, auth: &AuthConfig) -> AppResult<()> {
    let len = char_len(password);
    if len < auth.min_password_len || len > auth.max_password_len {
        return Err(AppError::Validation(ErrorCode::PasswordNonConforming));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub password: String,
    #[serde(default)]
    pub invite_code: Option<String>,
}

pub fn create_user(
    conn: &Connection,
    hasher: &CredentialHasher,
    auth: &AuthConfig,
    accounts: &AccountsConfig,
    new_user: &NewUser,
) -> AppResult<User> {
    validate_username(&new_user.username)?;
    let display_name = validate_display_name(&new_user.display_name)?;
    validate_password(&new_user.password, auth)?;

    if User::by_username(conn, &new_user.username)?.is_some() {
        return Err(AppError::Conflict(ErrorCode::UsernameTaken));
    }

    match new_user.invite_code.as_deref() {
        Some(code) => invites::redeem_invite(conn, code)?,
        None if accounts.require_invite_code => {
            return Err(AppError::Validation(ErrorCode::InviteCodeRequired))
        }
        None => {}
    }

    let (hash, salt) = hasher.new_credentials(&new_user.password)?;
    conn.execute(
        "INSERT INTO users
            (username, display_name, password_hash, password_salt, creation_time,
             account_approved)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new_user.username,
            display_name,
            hash,
            salt,
            timestamp(),
            !accounts.require_admin_approval
        ],
    )?;

    let user = User::by_id(conn, conn.last_insert_rowid())?
        .ok_or_else(|| AppError::Internal("Inserted user vanished".into()))?;
    tracing::info!("Created user {} ({})", user.username, user.id);
    Ok(user)
}

/// Check a username and password and open a session. Returns the raw token.
pub fn login(
    conn: &Connection,
    hasher: &CredentialHasher,
    username: &str,
    password: &str,
    client_ip: &str,
    user_agent: &str,
) -> AppResult<String> {
    let user =
        User::by_username(conn, username)?.ok_or(AppError::NotFound(ErrorCode::UserNotFound))?;

    if !hasher.verify_password_valid(password, &user.password_salt, &user.password_hash) {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(AppError::Unauthenticated(ErrorCode::IncorrectPassword));
    }
    if !user.account_approved {
        return Err(AppError::Unauthenticated(ErrorCode::AccountNotApproved));
    }

    let (token, session) = create_session(conn, user.id, client_ip, user_agent)?;
    tracing::info!("User {} logged in (session {})", user.id, session.id);
    Ok(token)
}

/// Replace the principal's password. The old password is checked before the new one
/// is validated. Other sessions are revoked when `auth.revoke_sessions_on_password_change`
/// is set; the session making the change always survives.
pub fn change_password(
    conn: &Connection,
    hasher: &CredentialHasher,
    auth: &AuthConfig,
    principal: &Principal,
    old_password: &str,
    new_password: &str,
) -> AppResult<()> {
    let session_id = principal.require_session()?;
    let user = &principal.user;

    if !hasher.verify_password_valid(old_password, &user.password_salt, &user.password_hash) {
        return Err(AppError::Unauthenticated(ErrorCode::IncorrectPassword));
    }
    validate_password(new_password, auth)?;

    let (hash, salt) = hasher.new_credentials(new_password)?;
    conn.execute(
        "UPDATE users SET password_hash = ?1, password_salt = ?2 WHERE id = ?3",
        params![hash, salt, user.id],
    )?;

    if auth.revoke_sessions_on_password_change {
        let revoked = revoke_user_sessions(conn, user.id, Some(session_id))?;
        tracing::info!(
            "Password changed for user {}; revoked {} other session(s)",
            user.id,
            revoked
        );
    } else {
        tracing::info!("Password changed for user {}", user.id);
    }
    Ok(())
}

/// Delete the principal's account after re-checking the password. Everything the user
/// owns goes with it; reports they filed stay, without a reporter.
pub fn delete_user(
    conn: &Connection,
    hasher: &CredentialHasher,
    principal: &Principal,
    password: &str,
) -> AppResult<()> {
    principal.require_session()?;
    let user = &principal.user;

    if !hasher.verify_password_valid(password, &user.password_salt, &user.password_hash) {
        return Err(AppError::Unauthenticated(ErrorCode::IncorrectPassword));
    }

    conn.execute("DELETE FROM users WHERE id = ?1", params![user.id])?;
    tracing::info!("Deleted user {} ({})", user.username, user.id);
    Ok(())
}

pub fn username_available(conn: &Connection, username: &str) -> AppResult<bool> {
    Ok(User::by_username(conn, username)?.is_none())
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub creation_time: String,
    pub attributes: AccountAttributes,
    pub profile_picture: Option<String>,
    pub header_picture: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
    pub viewer_follows: bool,
}

fn image_identifier(conn: &Connection, image_id: Option<i64>) -> AppResult<Option<String>> {
    let Some(id) = image_id else {
        return Ok(None);
    };
    let identifier = conn.query_row(
        "SELECT identifier FROM images WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(Some(identifier))
}

/// Public profile. A user blocking the viewer, or blocked by them, looks absent.
pub fn get_profile(
    conn: &Connection,
    viewer: Option<&Principal>,
    username: &str,
) -> AppResult<Profile> {
    let user =
        User::by_username(conn, username)?.ok_or(AppError::NotFound(ErrorCode::UserNotFound))?;

    let mut viewer_follows = false;
    if let Some(viewer) = viewer {
        viewer.require(ApiKeyPermission::Read)?;
        if graph::blocked_between(conn, user.id, viewer.user_id())? {
            return Err(AppError::NotFound(ErrorCode::UserNotFound));
        }
        viewer_follows = graph::is_following(conn, viewer.user_id(), user.id)?;
    }

    let (follower_count, following_count, post_count) = conn.query_row(
        "SELECT (SELECT COUNT(*) FROM follows WHERE following_id = ?1),
                (SELECT COUNT(*) FROM follows WHERE user_id = ?1),
                (SELECT COUNT(*) FROM posts WHERE user_id = ?1)",
        params![user.id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(Profile {
        profile_picture: image_identifier(conn, user.profile_pic_id)?,
        header_picture: image_identifier(conn, user.header_pic_id)?,
        username: user.username,
        display_name: user.display_name,
        bio: user.bio,
        creation_time: user.creation_time,
        attributes: user.account_attributes,
        follower_count,
        following_count,
        post_count,
        viewer_follows,
    })
}

/// Partial profile update. Absent fields are left alone; an empty bio or picture
/// identifier clears it.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub header_picture: Option<String>,
    pub private: Option<bool>,
}

fn picture_slot(
    conn: &Connection,
    principal: &Principal,
    identifier: &str,
) -> AppResult<Option<Image>> {
    if identifier.is_empty() {
        return Ok(None);
    }
    images::owned_image(conn, principal, identifier).map(Some)
}

pub fn update_profile(
    conn: &Connection,
    principal: &Principal,
    update: &ProfileUpdate,
) -> AppResult<User> {
    principal.require(ApiKeyPermission::EditProfile)?;
    let user_id = principal.user_id();

    if let Some(display_name) = &update.display_name {
        let display_name = validate_display_name(display_name)?;
        conn.execute(
            "UPDATE users SET display_name = ?1 WHERE id = ?2",
            params![display_name, user_id],
        )?;
    }

    if let Some(bio) = &update.bio {
        let bio = bio.trim();
        if char_len(bio) > BIO_MAX_LEN {
            return Err(AppError::Validation(ErrorCode::BioTooLong));
        }
        let bio = (!bio.is_empty()).then_some(bio);
        conn.execute(
            "UPDATE users SET bio = ?1 WHERE id = ?2",
            params![bio, user_id],
        )?;
    }

    if let Some(identifier) = &update.profile_picture {
        let image = picture_slot(conn, principal, identifier)?;
        conn.execute(
            "UPDATE users SET profile_pic_id = ?1 WHERE id = ?2",
            params![image.map(|i| i.id), user_id],
        )?;
    }

    if let Some(identifier) = &update.header_picture {
        let image = picture_slot(conn, principal, identifier)?;
        conn.execute(
            "UPDATE users SET header_pic_id = ?1 WHERE id = ?2",
            params![image.map(|i| i.id), user_id],
        )?;
    }

    if let Some(private) = update.private {
        let mut attributes = principal.attributes();
        if private {
            attributes.insert(AccountAttribute::Private);
        } else {
            attributes.remove(AccountAttribute::Private);
        }
        conn.execute(
            "UPDATE users SET account_attributes = ?1 WHERE id = ?2",
            params![attributes, user_id],
        )?;
    }

    User::by_id(conn, user_id)?.ok_or(AppError::NotFound(ErrorCode::UserNotFound))
}

pub fn approve_user(conn: &Connection, principal: &Principal, username: &str) -> AppResult<()> {
    principal.require_admin()?;
    let updated = conn.execute(
        "UPDATE users SET account_approved = 1 WHERE username = ?1",
        params![username],
    )?;
    if updated == 0 {
        return Err(AppError::NotFound(ErrorCode::UserNotFound));
    }
    tracing::info!("Admin {} approved {}", principal.user_id(), username);
    Ok(())
}

/// Grant and revoke account attributes. Admins manage ordinary attributes; changing
/// ADMIN or INSTANCE_ADMIN needs an instance admin.
pub fn set_attributes(
    conn: &Connection,
    principal: &Principal,
    username: &str,
    grant: AccountAttributes,
    revoke: AccountAttributes,
) -> AppResult<AccountAttributes> {
    let privileged: AccountAttributes =
        [AccountAttribute::Admin, AccountAttribute::InstanceAdmin]
            .as_slice()
            .into();
    if grant.union(&revoke).intersection(&privileged).is_empty() {
        principal.require_admin()?;
    } else {
        principal.require_instance_admin()?;
    }

    let user =
        User::by_username(conn, username)?.ok_or(AppError::NotFound(ErrorCode::UserNotFound))?;
    let attributes = user.account_attributes.union(&grant).difference(&revoke);
    conn.execute(
        "UPDATE users SET account_attributes = ?1 WHERE id = ?2",
        params![attributes, user.id],
    )?;
    tracing::info!(
        "User {} set attributes of {} to {:?}",
        principal.user_id(),
        user.username,
        attributes
    );
    Ok(attributes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::{list_sessions, resolve_session};
    use crate::auth::{AuthorizationResolver, Credential};
    use crate::social::images::register_image;
    use crate::test_support::{acting, fast_hasher, grant, insert_user, test_pool};
    use chrono::Duration;

    fn new_user(username: &str, password: &str) -> NewUser {
        NewUser {
            username: username.into(),
            display_name: username.into(),
            password: password.into(),
            invite_code: None,
        }
    }

    fn register(conn: &Connection, hasher: &CredentialHasher, username: &str) -> User {
        create_user(
            conn,
            hasher,
            &AuthConfig::default(),
            &AccountsConfig::default(),
            &new_user(username, "password"),
        )
        .unwrap()
    }

    fn principal_for(conn: &Connection, token: &str) -> Principal {
        AuthorizationResolver::new(720)
            .require(conn, Some(token))
            .unwrap()
    }

    #[test]
    fn username_rules() {
        assert!(validate_username("alice_01").is_ok());
        assert!(validate_username(&"a".repeat(USERNAME_MAX_LEN)).is_ok());
        let too_long = "a".repeat(USERNAME_MAX_LEN + 1);
        for bad in ["", "has space", "émile", "dash-ed", too_long.as_str()] {
            assert!(validate_username(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn password_length_rules() {
        let auth = AuthConfig::default();
        assert!(validate_password("1234567", &auth).is_err());
        assert!(validate_password("12345678", &auth).is_ok());
        assert!(validate_password(&"a".repeat(auth.max_password_len + 1), &auth).is_err());
    }

    #[test]
    fn duplicate_usernames_conflict() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let hasher = fast_hasher();
        register(&conn, &hasher, "alice");

        let result = create_user(
            &conn,
            &hasher,
            &AuthConfig::default(),
            &AccountsConfig::default(),
            &new_user("alice", "password"),
        );
        assert!(matches!(
            result,
            Err(AppError::Conflict(ErrorCode::UsernameTaken))
        ));
        assert!(!username_available(&conn, "alice").unwrap());
        assert!(username_available(&conn, "bob").unwrap());
    }

    #[test]
    fn invite_codes_gate_registration_when_required() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let hasher = fast_hasher();
        let accounts = AccountsConfig {
            require_invite_code: true,
            ..AccountsConfig::default()
        };
        let auth = AuthConfig::default();

        assert!(matches!(
            create_user(&conn, &hasher, &auth, &accounts, &new_user("bob", "password")),
            Err(AppError::Validation(ErrorCode::InviteCodeRequired))
        ));

        let alice = acting(insert_user(&conn, "alice"));
        let invite = invites::generate_invite(&conn, &alice, 5).unwrap();
        let mut bob = new_user("bob", "password");
        bob.invite_code = Some(invite.code.clone());
        create_user(&conn, &hasher, &auth, &accounts, &bob).unwrap();

        let mut carol = new_user("carol", "password");
        carol.invite_code = Some(invite.code);
        assert!(matches!(
            create_user(&conn, &hasher, &auth, &accounts, &carol),
            Err(AppError::Validation(ErrorCode::InviteCodeInvalid))
        ));
    }

    #[test]
    fn login_checks_password_and_approval() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let hasher = fast_hasher();
        let accounts = AccountsConfig {
            require_admin_approval: true,
            ..AccountsConfig::default()
        };
        create_user(
            &conn,
            &hasher,
            &AuthConfig::default(),
            &accounts,
            &new_user("alice", "password"),
        )
        .unwrap();

        assert!(matches!(
            login(&conn, &hasher, "nobody", "password", "ip", "ua"),
            Err(AppError::NotFound(ErrorCode::UserNotFound))
        ));
        assert!(matches!(
            login(&conn, &hasher, "alice", "wrong", "ip", "ua"),
            Err(AppError::Unauthenticated(ErrorCode::IncorrectPassword))
        ));
        assert!(matches!(
            login(&conn, &hasher, "alice", "password", "ip", "ua"),
            Err(AppError::Unauthenticated(ErrorCode::AccountNotApproved))
        ));

        let admin = insert_user(&conn, "admin");
        let admin = acting(grant(&conn, &admin, &[AccountAttribute::Admin]));
        approve_user(&conn, &admin, "alice").unwrap();
        assert!(login(&conn, &hasher, "alice", "password", "ip", "ua").is_ok());
    }

    #[test]
    fn password_change_keeps_current_session_only() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let hasher = fast_hasher();
        let auth = AuthConfig::default();
        register(&conn, &hasher, "test");

        let t1 = login(&conn, &hasher, "test", "password", "ip", "ua").unwrap();
        let other = login(&conn, &hasher, "test", "password", "ip", "ua").unwrap();
        let principal = principal_for(&conn, &t1);

        assert!(matches!(
            change_password(&conn, &hasher, &auth, &principal, "wrong", "password1"),
            Err(AppError::Unauthenticated(ErrorCode::IncorrectPassword))
        ));
        assert!(matches!(
            change_password(&conn, &hasher, &auth, &principal, "password", "short"),
            Err(AppError::Validation(ErrorCode::PasswordNonConforming))
        ));

        change_password(&conn, &hasher, &auth, &principal, "password", "password1").unwrap();

        assert!(matches!(
            login(&conn, &hasher, "test", "password", "ip", "ua"),
            Err(AppError::Unauthenticated(ErrorCode::IncorrectPassword))
        ));
        let t2 = login(&conn, &hasher, "test", "password1", "ip", "ua").unwrap();
        assert_ne!(t1, t2);

        let idle = Duration::hours(720);
        assert!(resolve_session(&conn, &t1, idle).unwrap().is_some());
        assert!(resolve_session(&conn, &other, idle).unwrap().is_none());
        assert_eq!(list_sessions(&conn, principal.user_id()).unwrap().len(), 2);
    }

    #[test]
    fn password_change_can_leave_sessions_alone() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let hasher = fast_hasher();
        let auth = AuthConfig {
            revoke_sessions_on_password_change: false,
            ..AuthConfig::default()
        };
        register(&conn, &hasher, "test");
        let t1 = login(&conn, &hasher, "test", "password", "ip", "ua").unwrap();
        let other = login(&conn, &hasher, "test", "password", "ip", "ua").unwrap();
        let principal = principal_for(&conn, &t1);

        change_password(&conn, &hasher, &auth, &principal, "password", "password1").unwrap();
        assert!(resolve_session(&conn, &other, Duration::hours(720))
            .unwrap()
            .is_some());
    }

    #[test]
    fn api_keys_cannot_change_passwords() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let hasher = fast_hasher();
        let user = register(&conn, &hasher, "test");
        let principal = Principal {
            user,
            credential: Credential::ApiKey {
                key_id: 1,
                permissions: crate::db::flags::ApiKeyPermissions::all(),
            },
        };

        assert!(matches!(
            change_password(
                &conn,
                &hasher,
                &AuthConfig::default(),
                &principal,
                "password",
                "password1"
            ),
            Err(AppError::Forbidden(ErrorCode::SessionRequired))
        ));
    }

    #[test]
    fn deleting_a_user_cascades_everything_but_reports() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let hasher = fast_hasher();
        register(&conn, &hasher, "alice");
        let bob = acting(insert_user(&conn, "bob"));

        let token = login(&conn, &hasher, "alice", "password", "ip", "ua").unwrap();
        let alice = principal_for(&conn, &token);
        crate::auth::api_keys::create_api_key(
            &conn,
            alice.user_id(),
            crate::db::flags::ApiKeyPermissions::all(),
        )
        .unwrap();

        let own_post = crate::social::posts::create_post(&conn, &alice, "mine", &[]).unwrap();
        let bob_post = crate::social::posts::create_post(&conn, &bob, "theirs", &[]).unwrap();
        crate::social::comments::create_comment(&conn, &alice, bob_post, "hey").unwrap();
        crate::social::likes::like_post(&conn, &alice, bob_post).unwrap();
        crate::social::likes::like_post(&conn, &bob, own_post).unwrap();
        let bob_comment =
            crate::social::comments::create_comment(&conn, &bob, bob_post, "own words").unwrap();
        crate::social::likes::like_comment(&conn, &alice, bob_comment).unwrap();
        graph::follow(&conn, &alice, "bob").unwrap();
        graph::follow(&conn, &bob, "alice").unwrap();
        let carol = acting(insert_user(&conn, "carol"));
        graph::block(&conn, &alice, "carol").unwrap();
        graph::block(&conn, &carol, "alice").unwrap();
        let report = crate::social::reports::report_post(
            &conn,
            &alice,
            bob_post,
            [crate::db::flags::ReportReason::Spam].as_slice().into(),
            None,
        )
        .unwrap();
        register_image(&conn, &alice).unwrap();
        invites::generate_invite(&conn, &alice, 5).unwrap();

        assert!(matches!(
            delete_user(&conn, &hasher, &alice, "wrong"),
            Err(AppError::Unauthenticated(ErrorCode::IncorrectPassword))
        ));
        delete_user(&conn, &hasher, &alice, "password").unwrap();

        for (table, column) in [
            ("user_sessions", "user_id"),
            ("api_keys", "owner_id"),
            ("posts", "user_id"),
            ("comments", "user_id"),
            ("post_likes", "user_id"),
            ("follows", "user_id"),
            ("follows", "following_id"),
            ("blocks", "user_id"),
            ("blocks", "blocking_id"),
            ("comment_likes", "user_id"),
            ("images", "uploader_id"),
            ("invite_codes", "user_id"),
        ] {
            let count: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?1"),
                    params![alice.user_id()],
                    |r| r.get(0),
                )
                .unwrap();
            assert_eq!(count, 0, "{table}.{column}");
        }
        // likes on the deleted user's posts go with the posts
        let likes: i64 = conn
            .query_row("SELECT COUNT(*) FROM post_likes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(likes, 0);
        // bob's comment on his own post survives, minus alice's like
        assert!(crate::db::models::Comment::by_id(&conn, bob_comment)
            .unwrap()
            .is_some());

        let report = crate::db::models::Report::by_id(&conn, report)
            .unwrap()
            .unwrap();
        assert_eq!(report.reporter_id, None);
        assert!(resolve_session(&conn, &token, Duration::hours(720))
            .unwrap()
            .is_none());
    }

    #[test]
    fn profile_reflects_counts_and_hides_blockers() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = acting(insert_user(&conn, "alice"));
        let bob = acting(insert_user(&conn, "bob"));
        graph::follow(&conn, &bob, "alice").unwrap();
        crate::social::posts::create_post(&conn, &alice, "one", &[]).unwrap();

        let profile = get_profile(&conn, Some(&bob), "alice").unwrap();
        assert_eq!(profile.follower_count, 1);
        assert_eq!(profile.following_count, 0);
        assert_eq!(profile.post_count, 1);
        assert!(profile.viewer_follows);

        graph::block(&conn, &alice, "bob").unwrap();
        assert!(matches!(
            get_profile(&conn, Some(&bob), "alice"),
            Err(AppError::NotFound(ErrorCode::UserNotFound))
        ));
        assert!(get_profile(&conn, None, "alice").is_ok());
    }

    #[test]
    fn profile_update_validates_and_checks_image_ownership() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = acting(insert_user(&conn, "alice"));
        let bob = acting(insert_user(&conn, "bob"));
        let own = register_image(&conn, &alice).unwrap();
        let theirs = register_image(&conn, &bob).unwrap();

        let updated = update_profile(
            &conn,
            &alice,
            &ProfileUpdate {
                display_name: Some("  Alice  ".into()),
                bio: Some("hello".into()),
                profile_picture: Some(own.identifier.clone()),
                private: Some(true),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
        assert_eq!(updated.display_name, "Alice");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert!(updated.has_profile_picture());
        assert!(updated.is_private());

        assert!(matches!(
            update_profile(
                &conn,
                &alice,
                &ProfileUpdate {
                    header_picture: Some(theirs.identifier),
                    ..ProfileUpdate::default()
                }
            ),
            Err(AppError::Unauthorized(ErrorCode::ObjectNotOwnedByUser))
        ));
        assert!(matches!(
            update_profile(
                &conn,
                &alice,
                &ProfileUpdate {
                    bio: Some("x".repeat(BIO_MAX_LEN + 1)),
                    ..ProfileUpdate::default()
                }
            ),
            Err(AppError::Validation(ErrorCode::BioTooLong))
        ));

        let cleared = update_profile(
            &conn,
            &alice,
            &ProfileUpdate {
                profile_picture: Some(String::new()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();
        assert!(!cleared.has_profile_picture());
    }

    #[test]
    fn privileged_attributes_need_instance_admin() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let admin = insert_user(&conn, "admin");
        let admin = acting(grant(&conn, &admin, &[AccountAttribute::Admin]));
        let root = insert_user(&conn, "root");
        let root = acting(grant(&conn, &root, &[AccountAttribute::InstanceAdmin]));
        insert_user(&conn, "alice");

        let verified: AccountAttributes = [AccountAttribute::Verified].as_slice().into();
        let admin_bit: AccountAttributes = [AccountAttribute::Admin].as_slice().into();

        let result =
            set_attributes(&conn, &admin, "alice", verified, AccountAttributes::empty()).unwrap();
        assert!(result.contains(AccountAttribute::Verified));

        assert!(matches!(
            set_attributes(&conn, &admin, "alice", admin_bit, AccountAttributes::empty()),
            Err(AppError::Forbidden(ErrorCode::InsufficientPermissions))
        ));

        let result =
            set_attributes(&conn, &root, "alice", admin_bit, verified).unwrap();
        assert!(result.contains(AccountAttribute::Admin));
        assert!(!result.contains(AccountAttribute::Verified));
    }
}
