//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Hashes are stored as `pbkdf2$<iterations>$<salt hex>$<hash hex>` so the
//! iteration count can be raised later without invalidating stored hashes.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const DEFAULT_ITERATIONS: u32 = 600_000;
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;
const SCHEME: &str = "pbkdf2";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    iterations: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash `password` with a fresh random salt.
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let hash = derive(password, &salt, self.iterations);
        format!(
            "{}${}${}${}",
            SCHEME,
            self.iterations,
            hex::encode(salt),
            hex::encode(hash)
        )
    }
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

/// Check `password` against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    if iterations == 0 || expected.len() != HASH_LENGTH {
        return false;
    }

    let actual = derive(password, &salt, iterations);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(1_000);
        let stored = hasher.hash("s3cret-pass");
        assert!(stored.starts_with("pbkdf2$1000$"));
        assert!(verify_password("s3cret-pass", &stored));
        assert!(!verify_password("s3cret-Pass", &stored));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = PasswordHasher::new(1_000);
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[test]
    fn test_malformed_hashes_do_not_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "bcrypt$10$aa$bb"));
        assert!(!verify_password("x", "pbkdf2$abc$aa$bb"));
        assert!(!verify_password("x", "pbkdf2$1000$zz$bb"));
        assert!(!verify_password("x", "pbkdf2$1000$aa$bb$extra"));
    }
}
