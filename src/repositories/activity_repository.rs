use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use log::info;
use mongodb::{
    bson::{doc, DateTime, Document},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::AppResult,
    models::{
        domain::{activity::ACTIVITY_TTL_SECS, Activity},
        dto::request::{ActivityListQuery, Pagination},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn create(&self, activity: Activity) -> AppResult<Activity>;
    async fn list(
        &self,
        query: &ActivityListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Activity>, i64)>;
    async fn find_by_user(
        &self,
        user_id: &str,
        pagination: Pagination,
    ) -> AppResult<(Vec<Activity>, i64)>;
    /// Latest activities at or after `since`, newest first.
    async fn recent(&self, since: DateTime, limit: i64) -> AppResult<Vec<Activity>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoActivityRepository {
    collection: Collection<Activity>,
}

impl MongoActivityRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("activities");
        Self { collection }
    }

    async fn page(
        &self,
        filter: Document,
        pagination: Pagination,
    ) -> AppResult<(Vec<Activity>, i64)> {
        let total = self.collection.count_documents(filter.clone()).await?;
        let activities = self
            .collection
            .find(filter)
            .sort(doc! { "timestamp": -1 })
            .skip(pagination.offset())
            .limit(pagination.limit)
            .await?
            .try_collect()
            .await?;
        Ok((activities, total as i64))
    }
}

pub fn activity_filter(query: &ActivityListQuery) -> Document {
    let mut filter = doc! {};
    if let Some(campus) = query.campus {
        filter.insert("campus", campus.as_str());
    }
    if let Some(action) = query.action {
        filter.insert("action", action.as_str());
    }
    if let Some(user_id) = query.user_id.as_deref().filter(|u| !u.is_empty()) {
        filter.insert("user_id", user_id);
    }
    if let Some(date) = query.date.as_deref().filter(|d| !d.is_empty()) {
        filter.insert("date", date);
    }
    filter
}

#[async_trait]
impl ActivityRepository for MongoActivityRepository {
    async fn create(&self, activity: Activity) -> AppResult<Activity> {
        self.collection.insert_one(&activity).await?;
        Ok(activity)
    }

    async fn list(
        &self,
        query: &ActivityListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Activity>, i64)> {
        self.page(activity_filter(query), pagination).await
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        pagination: Pagination,
    ) -> AppResult<(Vec<Activity>, i64)> {
        self.page(doc! { "user_id": user_id }, pagination).await
    }

    async fn recent(&self, since: DateTime, limit: i64) -> AppResult<Vec<Activity>> {
        let activities = self
            .collection
            .find(doc! { "timestamp": { "$gte": since } })
            .sort(doc! { "timestamp": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;
        Ok(activities)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let activity_id = IndexModel::builder()
            .keys(doc! { "activity_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let user_timestamp = IndexModel::builder()
            .keys(doc! { "user_id": 1, "timestamp": -1 })
            .build();
        let target_action = IndexModel::builder()
            .keys(doc! { "target_id": 1, "action": 1 })
            .build();
        let campus_date = IndexModel::builder()
            .keys(doc! { "campus": 1, "date": 1 })
            .build();
        let action_date = IndexModel::builder()
            .keys(doc! { "action": 1, "date": 1 })
            .build();
        let ttl = IndexModel::builder()
            .keys(doc! { "timestamp": 1 })
            .options(
                IndexOptions::builder()
                    .expire_after(Duration::from_secs(ACTIVITY_TTL_SECS))
                    .build(),
            )
            .build();

        self.collection
            .create_indexes(vec![
                activity_id,
                user_timestamp,
                target_action,
                campus_date,
                action_date,
                ttl,
            ])
            .await?;

        info!("Created indexes on activities, TTL {} days", ACTIVITY_TTL_SECS / 86_400);
        Ok(())
    }
}
