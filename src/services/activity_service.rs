use std::sync::Arc;

use crate::{
    auth::{require_owner_or_admin, Claims},
    errors::AppResult,
    models::{
        domain::Activity,
        dto::{
            request::{ActivityListQuery, LimitQuery, PageQuery, Pagination},
            response::{ActivityDto, Page},
        },
    },
    repositories::ActivityRepository,
};

pub struct ActivityService {
    repository: Arc<dyn ActivityRepository>,
}

impl ActivityService {
    pub fn new(repository: Arc<dyn ActivityRepository>) -> Self {
        Self { repository }
    }

    /// Appends to the activity log. Failures are logged and never reach the caller.
    pub async fn record(&self, activity: Activity) {
        let action = activity.action;
        let target = activity.target_id.clone();
        if let Err(e) = self.repository.create(activity).await {
            log::warn!("Failed to record {} activity on {}: {}", action, target, e);
        }
    }

    pub async fn list(&self, query: ActivityListQuery) -> AppResult<Page<ActivityDto>> {
        let pagination = Pagination::new(query.page, query.limit);
        let (activities, total) = self.repository.list(&query, pagination).await?;
        Ok(Page::new(activities, pagination, total).map(ActivityDto::from))
    }

    pub async fn for_user(
        &self,
        claims: &Claims,
        user_id: &str,
        query: PageQuery,
    ) -> AppResult<Page<ActivityDto>> {
        require_owner_or_admin(claims, user_id)?;

        let pagination = Pagination::new(query.page, query.limit);
        let (activities, total) = self.repository.find_by_user(user_id, pagination).await?;
        Ok(Page::new(activities, pagination, total).map(ActivityDto::from))
    }

    /// The caller's latest activities, at most 20.
    pub async fn mine(&self, claims: &Claims, query: LimitQuery) -> AppResult<Vec<ActivityDto>> {
        let pagination = Pagination::new(Some(1), Some(query.capped(10, 20)));
        let (activities, _) = self
            .repository
            .find_by_user(claims.user_id(), pagination)
            .await?;
        Ok(activities.into_iter().map(ActivityDto::from).collect())
    }
}
