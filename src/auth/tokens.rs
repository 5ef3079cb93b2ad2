//! Bearer tokens: session tokens, API keys and invite codes.
//!
//! Tokens are 256 bits of CSPRNG output, so storage uses a plain SHA-256 digest. No salt
//! and no slow hash: precomputation is infeasible and every request has to verify one.

use rand::Rng;
use sha2::{Digest, Sha256};

const TOKEN_BYTES: usize = 32;

/// Length of the indexed digest prefix used to find candidate rows.
pub const LOOKUP_KEY_LEN: usize = 16;

/// Generate a cryptographically secure 64-character hex token
pub fn generate_token() -> String {
    let bytes: [u8; TOKEN_BYTES] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

pub fn verify_token(raw: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_token(raw).as_bytes(), stored_hash.as_bytes())
}

/// Non-secret index key derived from a token digest.
pub fn lookup_key(token_hash: &str) -> &str {
    token_hash.get(..LOOKUP_KEY_LEN).unwrap_or(token_hash)
}

/// Cheap shape check so garbage never reaches the database.
pub fn is_well_formed(raw: &str) -> bool {
    raw.len() == TOKEN_BYTES * 2 && raw.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Byte comparison whose running time does not depend on where inputs differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // If lengths differ, still compare to avoid timing leak
    let len_match = a.len() == b.len();
    let max_len = a.len().max(b.len());

    let mut result = 0u8;
    for i in 0..max_len {
        let byte_a = a.get(i).copied().unwrap_or(0);
        let byte_b = b.get(i).copied().unwrap_or(0);
        result |= byte_a ^ byte_b;
    }

    len_match && result == 0
}
