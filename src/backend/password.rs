//! Credential helpers for the auth half of the backend: Argon2id password
//! hashes, random session/reset tokens and the sign-up email check.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use validator::ValidateEmail;

use super::error::{BackendError, BackendResult};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Hashes a password with Argon2id (crate default parameters) and a random salt.
/// Returns the PHC string, which embeds algorithm, parameters and salt.
pub fn hash_password(password: &str) -> BackendResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| BackendError::Storage(anyhow::anyhow!("failed to hash password: {e}")))
}

/// Verifies a password against a stored PHC string. A malformed hash is a
/// storage problem, not a wrong password.
pub fn verify_password(password: &str, hash: &str) -> BackendResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| BackendError::Storage(anyhow::anyhow!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// 32 random bytes, hex encoded.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Accepts `local@domain.tld` where the address parses as an email and the
/// last domain label has at least two characters.
pub fn is_valid_email(email: &str) -> bool {
    if !email.validate_email() {
        return false;
    }
    email
        .rsplit_once('@')
        .and_then(|(_, domain)| domain.rsplit_once('.'))
        .is_some_and(|(host, tld)| !host.is_empty() && tld.chars().count() >= 2)
}

pub fn validate_password(password: &str) -> BackendResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BackendError::InvalidInput(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn test_same_password_different_salts() {
        let a = hash_password("hunter22").unwrap();
        let b = hash_password("hunter22").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify_password("x", "not-a-hash").is_err());
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("a.b+c@mail.example.io"));
        assert!(!is_valid_email("ada@example.c"));
        assert!(!is_valid_email("ada@.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada example@example.com"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada"));
        assert!(!is_valid_email("ada@localhost"));
    }

    #[test]
    fn test_password_length() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }
}
