use async_trait::async_trait;
use futures::TryStreamExt;
use log::info;
use mongodb::{
    bson::{doc, DateTime, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::{
        domain::User,
        dto::request::{Pagination, UserListQuery},
    },
    repositories::{is_duplicate_key, search_clause, set_fields},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> AppResult<User>;
    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list(
        &self,
        query: &UserListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<User>, i64)>;
    /// Applies `changes` with `$set`. Counters and hashes not named stay as stored.
    async fn update(&self, user_id: &str, changes: Document) -> AppResult<User>;
    async fn set_last_login(&self, user_id: &str, at: DateTime) -> AppResult<()>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("users");
        Self { collection }
    }
}

pub fn user_filter(query: &UserListQuery) -> Document {
    let mut filter = doc! {};
    if let Some(campus) = query.campus {
        filter.insert("campus", campus.as_str());
    }
    if let Some(role) = query.role {
        filter.insert("role", role.as_str());
    }
    if let Some(department) = query.department.as_deref().filter(|d| !d.is_empty()) {
        filter.insert("department", department);
    }
    if let Some(status) = query.status {
        filter.insert("status", status.as_str());
    }
    if let Some(clause) = search_clause(query.search.as_deref(), &["full_name", "email"]) {
        filter.insert("$or", clause);
    }
    filter
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        match self.collection.insert_one(&user).await {
            Ok(_) => Ok(user),
            Err(err) if is_duplicate_key(&err) => {
                Err(AppError::AlreadyExists("Email already exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<User>> {
        let user = self
            .collection
            .find_one(doc! { "user_id": user_id })
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = self.collection.find_one(doc! { "email": email }).await?;
        Ok(user)
    }

    async fn list(
        &self,
        query: &UserListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<User>, i64)> {
        let filter = user_filter(query);
        let total = self.collection.count_documents(filter.clone()).await?;

        let users = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .skip(pagination.offset())
            .limit(pagination.limit)
            .await?
            .try_collect()
            .await?;

        Ok((users, total as i64))
    }

    async fn update(&self, user_id: &str, changes: Document) -> AppResult<User> {
        self.collection
            .find_one_and_update(doc! { "user_id": user_id }, set_fields(changes))
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn set_last_login(&self, user_id: &str, at: DateTime) -> AppResult<()> {
        self.collection
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": { "last_login": at } },
            )
            .await?;
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        for field in ["user_id", "email"] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            let model = IndexModel::builder()
                .keys(keys)
                .options(unique.clone())
                .build();
            self.collection.create_index(model).await?;
        }

        let campus_role = IndexModel::builder()
            .keys(doc! { "campus": 1, "role": 1 })
            .build();
        self.collection.create_index(campus_role).await?;

        info!("Created indexes on users (user_id, email, campus+role)");
        Ok(())
    }
}
