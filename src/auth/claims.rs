use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{Campus, User, UserRole};

pub const REFRESH_TOKEN_TYPE: &str = "refresh";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub role: UserRole,
    pub campus: Campus,
    pub iat: usize,
    pub exp: usize,
}

impl Claims {
    pub fn new(user: &User, ttl: Duration) -> Self {
        let iat = Utc::now().timestamp() as usize;
        Self {
            sub: user.user_id.clone(),
            email: user.email.clone(),
            role: user.role,
            campus: user.campus,
            iat,
            exp: iat + ttl.as_secs() as usize,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: String,
    pub token_type: String,
    /// Random id so that two tokens minted in the same second differ.
    pub jti: String,
    pub iat: usize,
    pub exp: usize,
}

impl RefreshClaims {
    pub fn new(user_id: &str, ttl: Duration) -> Self {
        let iat = Utc::now().timestamp() as usize;
        Self {
            sub: user_id.to_string(),
            token_type: REFRESH_TOKEN_TYPE.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat,
            exp: iat + ttl.as_secs() as usize,
        }
    }
}
