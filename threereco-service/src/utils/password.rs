//! Argon2id password hashing, run on the blocking pool.

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, Rng};

pub const GENERATED_LENGTH: usize = 32;

/// Plain-text password. `Debug` never prints the value.
#[derive(Clone)]
pub struct Password(String);

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(***)")
    }
}

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Random password for accounts created without one. Nobody is told it;
/// the account is flagged for a reset instead.
pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_LENGTH)
        .map(char::from)
        .collect()
}

/// PHC string with a fresh random salt.
pub fn hash(password: &Password) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string())
}

/// `Ok(false)` on mismatch. A stored hash that does not parse is an error.
pub fn verify(password: &Password, stored: &str) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| anyhow::anyhow!("Stored password hash is malformed: {}", e))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e)),
    }
}

pub async fn hash_blocking(password: String) -> Result<String, anyhow::Error> {
    tokio::task::spawn_blocking(move || hash(&Password::new(password)))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {}", e))?
}

pub async fn verify_blocking(password: String, stored: String) -> Result<bool, anyhow::Error> {
    tokio::task::spawn_blocking(move || verify(&Password::new(password), &stored))
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))?
}

/// Spends one verification against a throwaway hash, so an unknown
/// account costs as much as a wrong password.
pub async fn verify_decoy(password: String) {
    static DECOY: OnceLock<Option<String>> = OnceLock::new();

    let decoy = DECOY
        .get_or_init(|| hash(&Password::new("decoy-password".to_string())).ok())
        .clone();
    if let Some(decoy) = decoy {
        let _ = verify_blocking(password, decoy).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_argon2id() {
        let password = Password::new("mySecurePassword123".to_string());
        let first = hash(&password).unwrap();
        let second = hash(&password).unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify(&password, &first).unwrap());
        assert!(verify(&password, &second).unwrap());
    }

    #[test]
    fn test_mismatch_is_false_not_error() {
        let stored = hash(&Password::new("mySecurePassword123".to_string())).unwrap();
        assert!(!verify(&Password::new("wrongPassword".to_string()), &stored).unwrap());
    }

    #[test]
    fn test_generated_passwords_are_long_and_distinct() {
        let first = generate();
        assert_eq!(first.len(), GENERATED_LENGTH);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(first, generate());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        assert!(verify(&Password::new("x".to_string()), "not-a-phc-string").is_err());
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let stored = hash_blocking("hunter2aa".to_string()).await.unwrap();
        assert!(verify_blocking("hunter2aa".to_string(), stored.clone()).await.unwrap());
        assert!(!verify_blocking("wrong".to_string(), stored).await.unwrap());
        verify_decoy("anything".to_string()).await;
    }

    #[test]
    fn test_debug_hides_password() {
        let password = Password::new("hunter2aa".to_string());
        assert_eq!(format!("{:?}", password), "Password(***)");
    }
}
