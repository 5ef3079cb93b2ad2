use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::auth::{ensure_owner, Principal};
use crate::db::flags::ApiKeyPermission;
use crate::db::models::Image;
use crate::db::timestamp;
use crate::error::{AppError, AppResult, ErrorCode};

/// Record an uploaded image. The file itself lives in external storage keyed by the
/// returned identifier.
pub fn register_image(conn: &Connection, principal: &Principal) -> AppResult<Image> {
    principal.require(ApiKeyPermission::UploadImages)?;

    let image = Image {
        id: 0,
        uploader_id: principal.user_id(),
        identifier: Uuid::now_v7().to_string(),
        creation_time: timestamp(),
    };
    conn.execute(
        "INSERT INTO images (uploader_id, identifier, creation_time) VALUES (?1, ?2, ?3)",
        params![image.uploader_id, image.identifier, image.creation_time],
    )?;

    Ok(Image {
        id: conn.last_insert_rowid(),
        ..image
    })
}

/// An image the principal uploaded, for attaching to posts or profile slots.
pub fn owned_image(conn: &Connection, principal: &Principal, identifier: &str) -> AppResult<Image> {
    let image = Image::by_identifier(conn, identifier)?
        .ok_or(AppError::NotFound(ErrorCode::ImageNotFound))?;
    ensure_owner(image.uploader_id, principal)?;
    Ok(image)
}

/// Identifiers of images nothing refers to, for storage cleanup.
pub fn list_orphans(conn: &Connection, principal: &Principal) -> AppResult<Vec<String>> {
    principal.require_instance_admin()?;

    let mut stmt = conn.prepare(
        "SELECT i.identifier FROM images i
         WHERE NOT EXISTS (SELECT 1 FROM post_images p WHERE p.image_id = i.id)
           AND NOT EXISTS (SELECT 1 FROM users u
                           WHERE u.profile_pic_id = i.id OR u.header_pic_id = i.id)
         ORDER BY i.id",
    )?;
    let identifiers = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::flags::AccountAttribute;
    use crate::test_support::{acting, acting_with_key, grant, insert_user, test_pool};

    #[test]
    fn registered_images_start_orphaned() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = insert_user(&conn, "alice");
        let admin = grant(&conn, &alice, &[AccountAttribute::InstanceAdmin]);
        let admin = acting(admin);

        let image = register_image(&conn, &admin).unwrap();
        assert_eq!(image.uploader_id, admin.user_id());
        assert!(image.is_orphan(&conn).unwrap());
        assert_eq!(list_orphans(&conn, &admin).unwrap(), vec![image.identifier.clone()]);

        conn.execute(
            "UPDATE users SET profile_pic_id = ?1 WHERE id = ?2",
            params![image.id, admin.user_id()],
        )
        .unwrap();
        assert!(!image.is_orphan(&conn).unwrap());
        assert!(list_orphans(&conn, &admin).unwrap().is_empty());
    }

    #[test]
    fn identifiers_are_unique() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = acting(insert_user(&conn, "alice"));
        let a = register_image(&conn, &alice).unwrap();
        let b = register_image(&conn, &alice).unwrap();
        assert_ne!(a.identifier, b.identifier);
    }

    #[test]
    fn only_the_uploader_owns_an_image() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = acting(insert_user(&conn, "alice"));
        let bob = acting(insert_user(&conn, "bob"));
        let image = register_image(&conn, &alice).unwrap();

        assert!(owned_image(&conn, &alice, &image.identifier).is_ok());
        assert!(matches!(
            owned_image(&conn, &bob, &image.identifier),
            Err(AppError::Unauthorized(ErrorCode::ObjectNotOwnedByUser))
        ));
        assert!(matches!(
            owned_image(&conn, &alice, "missing"),
            Err(AppError::NotFound(ErrorCode::ImageNotFound))
        ));
    }

    #[test]
    fn orphan_listing_needs_instance_admin() {
        let pool = test_pool();
        let conn = pool.get().unwrap();
        let alice = acting(insert_user(&conn, "alice"));
        assert!(matches!(
            list_orphans(&conn, &alice),
            Err(AppError::Forbidden(ErrorCode::InsufficientPermissions))
        ));

        let key = acting_with_key(insert_user(&conn, "bob"), &[ApiKeyPermission::Read]);
        assert!(register_image(&conn, &key).is_err());
    }
}
