use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, Bson, DateTime, Document},
    Collection,
};
use serde::de::DeserializeOwned;

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::{
        domain::{ActionType, Campus, CourseStatus, UserStatus},
        dto::stats::{
            CampusStats, CountBucket, DailyActionRow, DepartmentBreakdown, HourlyStat,
            MaterialStats, OverviewStats, TopMaterial, TypeBreakdown, UserStats,
        },
    },
};

/// Read-only aggregations behind `/api/stats`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn overview(&self) -> AppResult<OverviewStats>;
    /// View, download and upload activity since `since`, grouped by `(date, action)`.
    async fn daily_rows(&self, since: DateTime) -> AppResult<Vec<DailyActionRow>>;
    /// Activity counts per hour of day since `since`. Hours without activity are absent.
    async fn hourly_counts(&self, since: DateTime) -> AppResult<Vec<HourlyStat>>;
    async fn campus(&self, campus: Campus) -> AppResult<CampusStats>;
    async fn materials(&self) -> AppResult<MaterialStats>;
    async fn users(&self, new_since: DateTime) -> AppResult<UserStats>;
}

pub struct MongoStatsRepository {
    users: Collection<Document>,
    courses: Collection<Document>,
    materials: Collection<Document>,
    activities: Collection<Document>,
}

impl MongoStatsRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.get_collection("users"),
            courses: db.get_collection("courses"),
            materials: db.get_collection("materials"),
            activities: db.get_collection("activities"),
        }
    }
}

async fn aggregate<T: DeserializeOwned>(
    collection: &Collection<Document>,
    pipeline: Vec<Document>,
) -> AppResult<Vec<T>> {
    let docs: Vec<Document> = collection.aggregate(pipeline).await?.try_collect().await?;
    docs.into_iter()
        .map(|d| from_document(d).map_err(AppError::from))
        .collect()
}

fn group_count(match_stage: Document, field: &str) -> Vec<Document> {
    vec![
        doc! { "$match": match_stage },
        doc! { "$group": { "_id": format!("${}", field), "count": { "$sum": 1 } } },
        doc! { "$sort": { "count": -1 } },
    ]
}

fn top_by(field: &str) -> Vec<Document> {
    let mut sort = Document::new();
    sort.insert(field, -1);
    let mut project = doc! { "_id": 0, "material_id": 1, "title": 1, "course_code": 1 };
    project.insert(field, 1);
    vec![
        doc! { "$match": { "is_deleted": false } },
        doc! { "$sort": sort },
        doc! { "$limit": 10 },
        doc! { "$project": project },
    ]
}

/// Reads a numeric aggregate field regardless of the BSON width Mongo chose.
fn number(doc: &Document, key: &str) -> i64 {
    match doc.get(key) {
        Some(Bson::Int32(v)) => *v as i64,
        Some(Bson::Int64(v)) => *v,
        Some(Bson::Double(v)) => *v as i64,
        _ => 0,
    }
}

#[async_trait]
impl StatsRepository for MongoStatsRepository {
    async fn overview(&self) -> AppResult<OverviewStats> {
        let active_users = doc! { "status": UserStatus::Active.as_str() };
        let live_materials = doc! { "is_deleted": false };

        let total_users = self.users.count_documents(active_users.clone()).await?;
        let total_courses = self
            .courses
            .count_documents(doc! { "status": CourseStatus::Active.as_str() })
            .await?;
        let total_materials = self.materials.count_documents(live_materials.clone()).await?;

        let totals: Vec<Document> = self
            .materials
            .aggregate(vec![
                doc! { "$match": live_materials.clone() },
                doc! { "$group": {
                    "_id": Bson::Null,
                    "downloads": { "$sum": "$download_count" },
                    "views": { "$sum": "$view_count" },
                } },
            ])
            .await?
            .try_collect()
            .await?;
        let (total_downloads, total_views) = totals
            .first()
            .map(|t| (number(t, "downloads"), number(t, "views")))
            .unwrap_or_default();

        let users_by_campus = aggregate(&self.users, group_count(active_users, "campus")).await?;
        let materials_by_type =
            aggregate(&self.materials, group_count(live_materials, "type")).await?;

        Ok(OverviewStats {
            total_users: total_users as i64,
            total_courses: total_courses as i64,
            total_materials: total_materials as i64,
            total_downloads,
            total_views,
            users_by_campus,
            materials_by_type,
        })
    }

    async fn daily_rows(&self, since: DateTime) -> AppResult<Vec<DailyActionRow>> {
        let actions = [ActionType::View, ActionType::Download, ActionType::Upload]
            .map(|a| a.as_str());
        let pipeline = vec![
            doc! { "$match": {
                "action": { "$in": actions.to_vec() },
                "timestamp": { "$gte": since },
            } },
            doc! { "$group": {
                "_id": { "date": "$date", "action": "$action" },
                "count": { "$sum": 1 },
                "users": { "$addToSet": "$user_id" },
            } },
            doc! { "$sort": { "_id.date": 1 } },
        ];
        aggregate(&self.activities, pipeline).await
    }

    async fn hourly_counts(&self, since: DateTime) -> AppResult<Vec<HourlyStat>> {
        let pipeline = vec![
            doc! { "$match": { "timestamp": { "$gte": since } } },
            doc! { "$group": { "_id": "$hour", "count": { "$sum": 1 } } },
            doc! { "$sort": { "_id": 1 } },
        ];
        aggregate(&self.activities, pipeline).await
    }

    async fn campus(&self, campus: Campus) -> AppResult<CampusStats> {
        let name = campus.as_str();
        let users = self
            .users
            .count_documents(doc! { "campus": name, "status": UserStatus::Active.as_str() })
            .await?;
        let courses = self
            .courses
            .count_documents(doc! { "campus": name, "status": CourseStatus::Active.as_str() })
            .await?;
        let materials = self
            .materials
            .count_documents(doc! { "campus": name, "is_deleted": false })
            .await?;
        let activities: Vec<CountBucket> =
            aggregate(&self.activities, group_count(doc! { "campus": name }, "action")).await?;

        Ok(CampusStats {
            campus,
            users: users as i64,
            courses: courses as i64,
            materials: materials as i64,
            activities,
        })
    }

    async fn materials(&self) -> AppResult<MaterialStats> {
        let by_type: Vec<TypeBreakdown> = aggregate(
            &self.materials,
            vec![
                doc! { "$match": { "is_deleted": false } },
                doc! { "$group": {
                    "_id": "$type",
                    "count": { "$sum": 1 },
                    "totalDownloads": { "$sum": "$download_count" },
                    "totalViews": { "$sum": "$view_count" },
                } },
                doc! { "$sort": { "count": -1 } },
            ],
        )
        .await?;

        let by_department: Vec<DepartmentBreakdown> = aggregate(
            &self.materials,
            vec![
                doc! { "$match": { "is_deleted": false } },
                doc! { "$group": {
                    "_id": "$department",
                    "count": { "$sum": 1 },
                    "totalDownloads": { "$sum": "$download_count" },
                } },
                doc! { "$sort": { "count": -1 } },
                doc! { "$limit": 10 },
            ],
        )
        .await?;

        let top_downloaded: Vec<TopMaterial> =
            aggregate(&self.materials, top_by("download_count")).await?;
        let top_viewed: Vec<TopMaterial> = aggregate(&self.materials, top_by("view_count")).await?;

        Ok(MaterialStats {
            by_type,
            by_department,
            top_downloaded,
            top_viewed,
        })
    }

    async fn users(&self, new_since: DateTime) -> AppResult<UserStats> {
        let active = doc! { "status": UserStatus::Active.as_str() };

        let by_role = aggregate(&self.users, group_count(active.clone(), "role")).await?;
        let by_campus = aggregate(&self.users, group_count(active, "campus")).await?;
        let by_status = aggregate(&self.users, group_count(doc! {}, "status")).await?;
        let new_users = self
            .users
            .count_documents(doc! { "created_at": { "$gte": new_since } })
            .await?;

        Ok(UserStats {
            by_role,
            by_campus,
            by_status,
            new_users_last_30_days: new_users as i64,
        })
    }
}
