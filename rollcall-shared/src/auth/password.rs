/// Password hashing with Argon2id
///
/// Hashes are PHC strings (`$argon2id$v=19$m=65536,t=3,p=4$salt$hash`) so the
/// parameters travel with the hash and verification needs no configuration.
///
/// # Example
///
/// ```
/// use rollcall_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("correct horse")?;
/// assert!(verify_password("correct horse", &hash)?);
/// assert!(!verify_password("battery staple", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};

/// Memory cost in KiB (64 MiB)
const M_COST: u32 = 65536;
const T_COST: u32 = 3;
const P_COST: u32 = 4;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id and a fresh random salt
///
/// Any string is accepted, including the empty string; sign-up enforces
/// presence, not strength.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(M_COST)
        .t_cost(T_COST)
        .p_cost(P_COST)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(password_hash.to_string())
}

/// Verifies a password against a stored hash in constant time
///
/// Returns `Ok(false)` for a wrong password and an error only when the stored
/// hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Hashes and verifies off the async runtime
///
/// Argon2id with these parameters takes tens of milliseconds of CPU, so API
/// handlers go through these wrappers instead of blocking a worker thread.
pub mod blocking {
    use super::PasswordError;

    pub async fn hash_password(password: String) -> Result<String, PasswordError> {
        tokio::task::spawn_blocking(move || super::hash_password(&password))
            .await
            .map_err(|e| PasswordError::HashError(format!("Hashing task failed: {}", e)))?
    }

    pub async fn verify_password(password: String, hash: String) -> Result<bool, PasswordError> {
        tokio::task::spawn_blocking(move || super::verify_password(&password, &hash))
            .await
            .map_err(|e| PasswordError::VerifyError(format!("Verification task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$m=65536,t=3,p=4$"));
    }

    #[test]
    fn test_hash_password_salts_differ() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("same", &a).unwrap());
        assert!(verify_password("same", &b).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("right").unwrap();
        assert!(!verify_password("wrong", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_short_password_is_accepted() {
        let hash = hash_password("p").unwrap();
        assert!(verify_password("p", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_malformed_hash() {
        assert!(matches!(
            verify_password("x", "not-a-phc-string"),
            Err(PasswordError::InvalidHash(_))
        ));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hash = blocking::hash_password("async".to_string()).await.unwrap();
        assert!(blocking::verify_password("async".to_string(), hash).await.unwrap());
    }
}
