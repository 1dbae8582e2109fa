use std::time::Duration;

use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};

use crate::{
    auth::claims::{Claims, RefreshClaims, REFRESH_TOKEN_TYPE},
    errors::{AppError, AppResult},
    models::domain::User,
};

pub const TOKEN_EXPIRED: &str = "Token expired";
pub const INVALID_TOKEN: &str = "Invalid token";
pub const INVALID_REFRESH_TOKEN: &str = "Invalid or expired refresh token";

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_expiry: Duration,
    refresh_expiry: Duration,
}

impl JwtService {
    pub fn new(secret: &SecretString, access_expiry: Duration, refresh_expiry: Duration) -> Self {
        let secret_bytes = secret.expose_secret().as_bytes();

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation: Validation::default(),
            access_expiry,
            refresh_expiry,
        }
    }

    pub fn create_token(&self, user: &User) -> AppResult<String> {
        let claims = Claims::new(user, self.access_expiry);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to create JWT: {}", e)))
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::Unauthorized(TOKEN_EXPIRED.to_string()),
                _ => AppError::Unauthorized(INVALID_TOKEN.to_string()),
            })
    }

    pub fn create_refresh_token(&self, user_id: &str) -> AppResult<String> {
        let claims = RefreshClaims::new(user_id, self.refresh_expiry);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::InternalError(format!("Failed to create refresh token: {}", e)))
    }

    pub fn refresh_expiry(&self) -> Duration {
        self.refresh_expiry
    }

    pub fn validate_refresh_token(&self, token: &str) -> AppResult<RefreshClaims> {
        let token_data = decode::<RefreshClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| {
                log::debug!("Refresh token rejected: {}", e);
                AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string())
            })?;

        // Access tokens are signed with the same key.
        if token_data.claims.token_type != REFRESH_TOKEN_TYPE {
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
        }

        Ok(token_data.claims)
    }
}
