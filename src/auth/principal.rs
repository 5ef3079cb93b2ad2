use crate::db::flags::{AccountAttribute, AccountAttributes, ApiKeyPermission, ApiKeyPermissions};
use crate::db::models::User;
use crate::error::{AppError, AppResult, ErrorCode};

/// How the acting user proved who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    Session { session_id: i64 },
    ApiKey {
        key_id: i64,
        permissions: ApiKeyPermissions,
    },
}

/// The resolved identity behind an authenticated request.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user: User,
    pub credential: Credential,
}

impl Principal {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub fn attributes(&self) -> AccountAttributes {
        self.user.account_attributes
    }

    pub fn is_private(&self) -> bool {
        self.user.is_private()
    }

    pub fn is_verified(&self) -> bool {
        self.user.is_verified()
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn is_moderator(&self) -> bool {
        self.user.is_moderator()
    }

    pub fn has_config_permissions(&self) -> bool {
        self.user.has_config_permissions()
    }

    /// Session credentials carry everything; API keys only what they were granted.
    pub fn allows(&self, permission: ApiKeyPermission) -> bool {
        match self.credential {
            Credential::Session { .. } => true,
            Credential::ApiKey { permissions, .. } => permissions.contains(permission),
        }
    }

    pub fn require(&self, permission: ApiKeyPermission) -> AppResult<()> {
        if self.allows(permission) {
            Ok(())
        } else {
            Err(AppError::Forbidden(ErrorCode::InsufficientPermissions))
        }
    }

    /// Account management (password, sessions, API keys, deletion) is never delegated
    /// to an API key. Returns the id of the current session.
    pub fn require_session(&self) -> AppResult<i64> {
        match self.credential {
            Credential::Session { session_id } => Ok(session_id),
            Credential::ApiKey { .. } => Err(AppError::Forbidden(ErrorCode::SessionRequired)),
        }
    }

    fn require_attribute(
        &self,
        attributes: &[AccountAttribute],
        permission: ApiKeyPermission,
    ) -> AppResult<()> {
        let held = attributes.iter().any(|a| self.user.has_attribute(*a));
        if !held {
            return Err(AppError::Forbidden(ErrorCode::InsufficientPermissions));
        }
        self.require(permission)
    }

    /// Moderator or admin account, and an API key (if any) granted `Moderate`.
    pub fn require_moderator(&self) -> AppResult<()> {
        self.require_attribute(
            &[AccountAttribute::Moderator, AccountAttribute::Admin],
            ApiKeyPermission::Moderate,
        )
    }

    pub fn require_admin(&self) -> AppResult<()> {
        self.require_attribute(&[AccountAttribute::Admin], ApiKeyPermission::Administer)
    }

    pub fn require_instance_admin(&self) -> AppResult<()> {
        self.require_attribute(
            &[AccountAttribute::InstanceAdmin],
            ApiKeyPermission::Administer,
        )
    }
}

/// Mutations on owned entities must come from the owner. Admin or moderator status
/// does not pass this check; overrides are explicit in the operations that allow them.
pub fn ensure_owner(owner_id: i64, principal: &Principal) -> AppResult<()> {
    if owner_id == principal.user_id() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(ErrorCode::ObjectNotOwnedByUser))
    }
}
