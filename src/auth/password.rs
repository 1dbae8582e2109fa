use crate::errors::{AppError, AppResult};

/// Hashes with bcrypt on the blocking pool. Values that are already bcrypt
/// hashes are returned untouched.
pub async fn hash_password(plain: &str, cost: u32) -> AppResult<String> {
    if is_bcrypt_hash(plain) {
        return Ok(plain.to_string());
    }

    let plain = plain.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
        .await
        .map_err(|e| AppError::InternalError(format!("Password hashing task failed: {}", e)))?
        .map_err(AppError::from)
}

/// A malformed stored hash counts as a mismatch.
pub async fn verify_password(plain: &str, hash: &str) -> AppResult<bool> {
    let plain = plain.to_string();
    let hash = hash.to_string();
    let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash))
        .await
        .map_err(|e| AppError::InternalError(format!("Password check task failed: {}", e)))?;

    match outcome {
        Ok(matches) => Ok(matches),
        Err(e) => {
            log::warn!("Stored password hash could not be verified: {}", e);
            Ok(false)
        }
    }
}

fn is_bcrypt_hash(value: &str) -> bool {
    value.starts_with("$2")
}
