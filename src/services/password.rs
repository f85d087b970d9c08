use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};

#[derive(Debug, thiserror::Error)]
#[error("Password hashing failed: {0}")]
pub struct HashingError(pub String);

pub fn hash_password(password: &str) -> Result<String, HashingError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| HashingError(e.to_string()))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    if let Ok(parsed_hash) = PasswordHash::new(password_hash) {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    } else {
        false
    }
}

/// Hashes a batch of passwords on the blocking pool, preserving order.
pub async fn hash_passwords(passwords: Vec<String>) -> Result<Vec<String>, HashingError> {
    tokio::task::spawn_blocking(move || {
        passwords
            .iter()
            .map(|password| hash_password(password))
            .collect::<Result<Vec<_>, _>>()
    })
    .await
    .map_err(|e| HashingError(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[tokio::test]
    async fn batch_hashing_keeps_order() {
        let hashes = hash_passwords(vec!["first-pass".into(), "second-pass".into()])
            .await
            .unwrap();
        assert_eq!(hashes.len(), 2);
        assert!(verify_password("first-pass", &hashes[0]));
        assert!(verify_password("second-pass", &hashes[1]));
    }
}
