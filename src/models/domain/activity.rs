use chrono::{Timelike, Utc};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::domain::common::{generate_id, ActionType, Campus, TargetType};

/// Activities older than a year are dropped by a TTL index.
pub const ACTIVITY_TTL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ActivityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Activity {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub activity_id: String,
    pub user_id: String,
    pub user_name: String,
    pub campus: Campus,
    pub action: ActionType,
    pub target_type: TargetType,
    pub target_id: String,
    #[serde(default)]
    pub target_title: String,
    #[serde(default)]
    pub metadata: ActivityMetadata,
    pub timestamp: DateTime,
    /// UTC calendar day, `YYYY-MM-DD`.
    pub date: String,
    /// UTC hour of day, 0..=23.
    pub hour: i32,
}

impl Activity {
    pub fn new(
        user_id: &str,
        user_name: &str,
        campus: Campus,
        action: ActionType,
        target_type: TargetType,
        target_id: &str,
        target_title: &str,
    ) -> Self {
        Self::at(
            chrono::Utc::now(),
            user_id,
            user_name,
            campus,
            action,
            target_type,
            target_id,
            target_title,
        )
    }

    /// Same as [`Activity::new`] with an explicit timestamp; `date` and `hour`
    /// are derived from it.
    #[allow(clippy::too_many_arguments)]
    pub fn at(
        timestamp: chrono::DateTime<Utc>,
        user_id: &str,
        user_name: &str,
        campus: Campus,
        action: ActionType,
        target_type: TargetType,
        target_id: &str,
        target_title: &str,
    ) -> Self {
        Self {
            id: None,
            activity_id: generate_id("ACT"),
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            campus,
            action,
            target_type,
            target_id: target_id.to_string(),
            target_title: target_title.to_string(),
            metadata: ActivityMetadata::default(),
            timestamp: DateTime::from_chrono(timestamp),
            date: timestamp.format("%Y-%m-%d").to_string(),
            hour: timestamp.hour() as i32,
        }
    }

    pub fn with_metadata(mut self, metadata: ActivityMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}
