use chrono::Utc;
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A persisted refresh token. Only the SHA-256 of the token is stored.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RefreshToken {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: DateTime,
    pub created_at: DateTime,
}

impl RefreshToken {
    pub fn new(user_id: &str, token: &str, expires_at: chrono::DateTime<Utc>) -> Self {
        Self {
            id: None,
            user_id: user_id.to_string(),
            token_hash: hash_token(token),
            expires_at: DateTime::from_chrono(expires_at),
            created_at: DateTime::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.expires_at > DateTime::now()
    }
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
