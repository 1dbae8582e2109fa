use serde::{Deserialize, Serialize};

use crate::models::{
    domain::{ActionType, Campus},
    dto::response::{ActivityDto, MaterialDto},
};

/// `{ _id, count }` bucket produced by a `$group` stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountBucket {
    #[serde(rename = "_id")]
    pub id: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_users: i64,
    pub total_courses: i64,
    pub total_materials: i64,
    pub total_downloads: i64,
    pub total_views: i64,
    pub users_by_campus: Vec<CountBucket>,
    pub materials_by_type: Vec<CountBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyKey {
    pub date: String,
    pub action: ActionType,
}

/// One `(date, action)` group from the activity log.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyActionRow {
    #[serde(rename = "_id")]
    pub key: DailyKey,
    pub count: i64,
    #[serde(default)]
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: String,
    pub downloads: i64,
    pub views: i64,
    pub uploads: i64,
    pub unique_users: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyStat {
    #[serde(alias = "_id")]
    pub hour: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeStats {
    pub recent_activities: Vec<ActivityDto>,
    pub hourly_stats: Vec<HourlyStat>,
    pub top_materials: Vec<MaterialDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CampusStats {
    pub campus: Campus,
    pub users: i64,
    pub courses: i64,
    pub materials: i64,
    pub activities: Vec<CountBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeBreakdown {
    #[serde(rename = "_id")]
    pub id: String,
    pub count: i64,
    pub total_downloads: i64,
    pub total_views: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentBreakdown {
    #[serde(rename = "_id")]
    pub id: String,
    pub count: i64,
    pub total_downloads: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMaterial {
    pub material_id: String,
    pub title: String,
    pub course_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialStats {
    pub by_type: Vec<TypeBreakdown>,
    pub by_department: Vec<DepartmentBreakdown>,
    pub top_downloaded: Vec<TopMaterial>,
    pub top_viewed: Vec<TopMaterial>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub by_role: Vec<CountBucket>,
    pub by_campus: Vec<CountBucket>,
    pub by_status: Vec<CountBucket>,
    pub new_users_last_30_days: i64,
}
