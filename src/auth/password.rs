use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

use crate::error::{AppError, AppResult};

pub fn hash_password(plain: &str) -> AppResult<String> {
    if plain.is_empty() {
        return Err(AppError::invalid_input("Password must not be empty"));
    }
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            AppError::internal(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Returns `false` for a malformed stored hash rather than an error.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "stored password hash is not parseable");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Runs hashing on the blocking pool; argon2 is deliberately slow.
pub async fn hash_password_blocking(plain: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&plain))
        .await
        .map_err(|e| AppError::internal(e.to_string()))?
}

pub async fn verify_password_blocking(plain: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
        .await
        .map_err(|e| AppError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
        assert_ne!(hash, password);
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn same_password_gets_fresh_salt() {
        let a = hash_password("pw1").unwrap();
        let b = hash_password("pw1").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("pw1", &a));
        assert!(verify_password("pw1", &b));
    }

    #[test]
    fn verify_is_false_on_malformed_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn empty_password_is_invalid_input() {
        let err = hash_password("").unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn blocking_variants_agree() {
        let hash = hash_password_blocking("pw1".into()).await.unwrap();
        assert!(verify_password_blocking("pw1".into(), hash.clone()).await.unwrap());
        assert!(!verify_password_blocking("pw2".into(), hash).await.unwrap());
    }
}
