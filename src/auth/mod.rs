pub mod api_keys;
pub mod password;
pub mod principal;
pub mod resolver;
pub mod session;
pub mod tokens;

pub use password::CredentialHasher;
pub use principal::{ensure_owner, Credential, Principal};
pub use resolver::{extract_bearer, AuthState, AuthorizationResolver};
