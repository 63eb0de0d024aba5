use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use uuid::Uuid;

use crate::{ResultSentinel, SentinelError};

pub(crate) fn hash_password(password: &str) -> ResultSentinel<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|err| SentinelError::PasswordHash(err.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|err| SentinelError::PasswordHash(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| SentinelError::PasswordHash(err.to_string()))
}

/// Check `password` against an Argon2 hash or a bcrypt hash carried over
/// from Sentry. Unparsable hashes never match.
pub(crate) fn verify_password(hash: &str, password: &str) -> bool {
    if is_bcrypt(hash) {
        return bcrypt::verify(password, hash).unwrap_or(false);
    }
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Whether `hash` should be replaced with an Argon2 one after a successful
/// login.
pub(crate) fn needs_rehash(hash: &str) -> bool {
    is_bcrypt(hash)
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2y$", "$2a$", "$2b$"]
        .iter()
        .any(|prefix| hash.starts_with(prefix))
}

/// 32 lowercase hex characters.
pub(crate) fn random_code() -> String {
    Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("secret").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "secret"));
        assert!(!verify_password(&hash, "Secret"));
    }

    #[test]
    fn same_password_gets_a_fresh_salt() {
        assert_ne!(
            hash_password("secret").unwrap(),
            hash_password("secret").unwrap()
        );
    }

    #[test]
    fn sentry_bcrypt_hashes_verify() {
        let hash = bcrypt::hash("sentryuser", 4).unwrap();
        let php_hash = hash.replacen("$2b$", "$2y$", 1);

        for hash in [&hash, &php_hash] {
            assert!(verify_password(hash, "sentryuser"));
            assert!(!verify_password(hash, "wrong"));
            assert!(needs_rehash(hash));
        }
        assert!(!needs_rehash(&hash_password("sentryuser").unwrap()));
    }

    #[test]
    fn malformed_hashes_do_not_verify() {
        assert!(!verify_password("$2y$10$truncated", "secret"));
        assert!(!verify_password("plain", "plain"));
        assert!(!verify_password("", ""));
    }

    #[test]
    fn codes_are_unique_hex() {
        let code = random_code();
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(code, random_code());
    }
}
