use std::sync::Arc;

use mongodb::bson::doc;
use validator::Validate;

use crate::{
    auth::hash_password,
    errors::{AppError, AppResult},
    models::{
        domain::{user::normalize_email, User, UserStatus},
        dto::{
            request::{CreateUserRequest, Pagination, UpdateUserRequest, UserListQuery},
            response::{Page, UserDto},
        },
    },
    repositories::UserRepository,
};

pub struct UserService {
    repository: Arc<dyn UserRepository>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, bcrypt_cost: u32) -> Self {
        Self {
            repository,
            bcrypt_cost,
        }
    }

    pub async fn list(&self, query: UserListQuery) -> AppResult<Page<UserDto>> {
        let pagination = Pagination::new(query.page, query.limit);
        let (users, total) = self.repository.list(&query, pagination).await?;
        Ok(Page::new(users, pagination, total).map(UserDto::from))
    }

    pub async fn get(&self, user_id: &str) -> AppResult<UserDto> {
        self.find(user_id).await.map(UserDto::from)
    }

    pub async fn create(&self, request: CreateUserRequest) -> AppResult<UserDto> {
        request.validate()?;

        let email = normalize_email(&request.email);
        if self.repository.find_by_email(&email).await?.is_some() {
            return Err(AppError::AlreadyExists("Email already exists".to_string()));
        }

        let password_hash = hash_password(&request.password, self.bcrypt_cost).await?;
        let user = User::new(
            &email,
            password_hash,
            &request.full_name,
            request.role,
            request.campus,
            &request.department,
        );
        let user = self.repository.create(user).await?;

        log::info!("Created {} account {}", user.role, user.user_id);
        Ok(user.into())
    }

    pub async fn update(&self, user_id: &str, request: UpdateUserRequest) -> AppResult<UserDto> {
        request.validate()?;

        let user = self
            .repository
            .update(user_id, request.changes()?)
            .await?;
        log::info!("Updated user {}", user.user_id);
        Ok(user.into())
    }

    /// Soft delete: the account is kept but marked inactive.
    pub async fn deactivate(&self, user_id: &str) -> AppResult<()> {
        self.repository
            .update(user_id, doc! { "status": UserStatus::Inactive.as_str() })
            .await?;

        log::info!("Deactivated user {}", user_id);
        Ok(())
    }

    async fn find(&self, user_id: &str) -> AppResult<User> {
        self.repository
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
