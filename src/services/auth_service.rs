use std::sync::Arc;

use chrono::Utc;
use mongodb::bson::{doc, DateTime};
use validator::Validate;

use crate::{
    auth::{
        hash_password, jwt::INVALID_REFRESH_TOKEN, middleware::USER_INACTIVE, verify_password,
        Claims, JwtService,
    },
    errors::{AppError, AppResult},
    models::{
        domain::{
            refresh_token::hash_token, user::normalize_email, ActionType, Activity,
            ActivityMetadata, RefreshToken, TargetType, User, UserRole,
        },
        dto::{
            request::{ChangePasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest},
            response::{AuthResponse, TokenPairDto, UserDto},
        },
    },
    repositories::{RefreshTokenRepository, UserRepository},
    services::activity_service::ActivityService,
};

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    activities: Arc<ActivityService>,
    jwt_service: Arc<JwtService>,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        activities: Arc<ActivityService>,
        jwt_service: Arc<JwtService>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            activities,
            jwt_service,
            bcrypt_cost,
        }
    }

    pub async fn login(
        &self,
        request: LoginRequest,
        metadata: ActivityMetadata,
    ) -> AppResult<AuthResponse> {
        request.validate()?;

        let mut user = self
            .users
            .find_by_email(&normalize_email(&request.email))
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

        if !user.is_active() {
            return Err(AppError::Forbidden(
                "Account is inactive or suspended".to_string(),
            ));
        }

        if !verify_password(&request.password, &user.password_hash).await? {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let tokens = self.issue_tokens(&user).await?;

        let now = DateTime::now();
        self.users.set_last_login(&user.user_id, now).await?;
        user.last_login = Some(now);

        self.activities
            .record(
                Activity::new(
                    &user.user_id,
                    &user.full_name,
                    user.campus,
                    ActionType::Login,
                    TargetType::User,
                    &user.user_id,
                    &user.email,
                )
                .with_metadata(metadata),
            )
            .await;

        log::info!("User {} logged in", user.user_id);

        Ok(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: user.into(),
        })
    }

    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        request.validate()?;

        let role = match request.role {
            None => UserRole::Student,
            Some(UserRole::Admin) => {
                return Err(AppError::ValidationError(
                    "Role must be student or lecturer".to_string(),
                ))
            }
            Some(role) => role,
        };

        let email = normalize_email(&request.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::AlreadyExists("Email already registered".to_string()));
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let user = User::new(
            &email,
            password_hash,
            &request.full_name,
            role,
            request.campus,
            &request.department,
        );
        let user = self.users.create(user).await.map_err(|e| match e {
            AppError::AlreadyExists(_) => {
                AppError::AlreadyExists("Email already registered".to_string())
            }
            other => other,
        })?;

        let tokens = self.issue_tokens(&user).await?;
        log::info!("Registered user {} ({})", user.user_id, user.role);

        Ok(AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: user.into(),
        })
    }

    /// Consumes the presented refresh token and issues a new pair.
    pub async fn refresh(&self, request: RefreshTokenRequest) -> AppResult<TokenPairDto> {
        let token = request
            .refresh_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Refresh token required".to_string()))?;

        let claims = self.jwt_service.validate_refresh_token(&token)?;

        let token_hash = hash_token(&token);
        let stored = self
            .refresh_tokens
            .find_by_token_hash(&token_hash)
            .await?
            .filter(|stored| stored.is_valid() && stored.user_id == claims.sub)
            .ok_or_else(|| AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()))?;

        let user = self
            .users
            .find_by_user_id(&stored.user_id)
            .await?
            .filter(User::is_active)
            .ok_or_else(|| AppError::Unauthorized(USER_INACTIVE.to_string()))?;

        // A concurrent refresh may have consumed it first.
        if !self.refresh_tokens.delete_by_token_hash(&token_hash).await? {
            return Err(AppError::Unauthorized(INVALID_REFRESH_TOKEN.to_string()));
        }

        self.issue_tokens(&user).await
    }

    pub async fn logout(&self, request: RefreshTokenRequest) -> AppResult<()> {
        if let Some(token) = request.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_tokens
                .delete_by_token_hash(&hash_token(&token))
                .await?;
        }
        Ok(())
    }

    pub async fn me(&self, claims: &Claims) -> AppResult<UserDto> {
        self.users
            .find_by_user_id(claims.user_id())
            .await?
            .map(UserDto::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    /// Replaces the password and signs the user out everywhere.
    pub async fn change_password(
        &self,
        claims: &Claims,
        request: ChangePasswordRequest,
    ) -> AppResult<()> {
        request.validate()?;

        let user = self
            .users
            .find_by_user_id(claims.user_id())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !verify_password(&request.current_password, &user.password_hash).await? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        let password_hash = hash_password(&request.new_password, self.bcrypt_cost).await?;
        self.users
            .update(&user.user_id, doc! { "password_hash": password_hash })
            .await?;

        let revoked = self
            .refresh_tokens
            .delete_all_for_user(claims.user_id())
            .await?;
        log::info!(
            "Password changed for {}, revoked {} refresh tokens",
            claims.user_id(),
            revoked
        );

        Ok(())
    }

    async fn issue_tokens(&self, user: &User) -> AppResult<TokenPairDto> {
        let access_token = self.jwt_service.create_token(user)?;
        let refresh_token = self.jwt_service.create_refresh_token(&user.user_id)?;

        let refresh_ttl = chrono::Duration::from_std(self.jwt_service.refresh_expiry())
            .map_err(|e| AppError::InternalError(format!("Invalid refresh expiry: {}", e)))?;
        self.refresh_tokens
            .create(RefreshToken::new(
                &user.user_id,
                &refresh_token,
                Utc::now() + refresh_ttl,
            ))
            .await?;

        Ok(TokenPairDto {
            access_token,
            refresh_token,
        })
    }
}
