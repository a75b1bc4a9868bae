//! Administrator credential hashing
//!
//! Passwords are stored as SHA-256 of `salt || password`, hex encoded, with a
//! random per-user salt. Pure functions only; HTTP handling lives in the
//! service crate.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of generated salts in bytes (hex encoded to twice this)
const SALT_BYTES: usize = 16;

/// Generate a random hex-encoded salt
pub fn generate_salt() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; SALT_BYTES] = rng.gen();
    hex::encode(bytes)
}

/// Calculate the stored hash for `password` under `salt`
///
/// # Examples
///
/// ```
/// use nlmfb_common::auth::hash_password;
///
/// let hash = hash_password("hunter2", "00ff");
/// assert_eq!(hash.len(), 64); // SHA-256 is 64 hex chars
/// ```
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a candidate password against a stored hash and salt
pub fn verify_password(password: &str, salt: &str, stored_hash: &str) -> bool {
    let calculated = hash_password(password, salt);
    constant_time_eq(calculated.as_bytes(), stored_hash.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic_per_salt() {
        let h1 = hash_password("secret", "abc");
        let h2 = hash_password("secret", "abc");
        let h3 = hash_password("secret", "abd");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
        assert!(h1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_password() {
        let salt = generate_salt();
        let stored = hash_password("correct horse", &salt);
        assert!(verify_password("correct horse", &salt, &stored));
        assert!(!verify_password("wrong horse", &salt, &stored));
        assert!(!verify_password("correct horse", "other", &stored));
    }

    #[test]
    fn test_salts_are_random_hex() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), SALT_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(hex::decode(&a).unwrap().len(), SALT_BYTES);
        assert_ne!(a, b);
    }
}
