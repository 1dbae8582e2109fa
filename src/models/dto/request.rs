use mongodb::bson::{doc, to_bson, Document};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::errors::AppResult;
use crate::models::domain::{
    ActionType, Campus, CourseMetadata, CourseStatus, MaterialType, UserPreferences, UserRole,
    UserStatus, Visibility,
};

pub const DEFAULT_PAGE_LIMIT: i64 = 10;
pub const MAX_PAGE_LIMIT: i64 = 100;

fn non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be empty".into()));
    }
    Ok(())
}

// ---- auth ----

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(custom(function = "non_blank"))]
    pub full_name: String,

    pub campus: Campus,

    #[validate(custom(function = "non_blank"))]
    pub department: String,

    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshTokenRequest {
    #[serde(rename = "refreshToken", default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword")]
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[serde(rename = "newPassword")]
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

// ---- users ----

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(custom(function = "non_blank"))]
    pub full_name: String,

    pub role: UserRole,

    pub campus: Campus,

    #[validate(custom(function = "non_blank"))]
    pub department: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(custom(function = "non_blank"))]
    pub full_name: Option<String>,
    pub role: Option<UserRole>,
    pub campus: Option<Campus>,
    #[validate(custom(function = "non_blank"))]
    pub department: Option<String>,
    pub status: Option<UserStatus>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    pub preferences: Option<UserPreferences>,
}

impl UpdateUserRequest {
    /// Fields for a `$set`, limited to what the request carries.
    pub fn changes(self) -> AppResult<Document> {
        let mut changes = doc! {};
        if let Some(full_name) = self.full_name {
            changes.insert("full_name", full_name.trim());
        }
        if let Some(role) = self.role {
            changes.insert("role", role.as_str());
        }
        if let Some(campus) = self.campus {
            changes.insert("campus", campus.as_str());
        }
        if let Some(department) = self.department {
            changes.insert("department", department.trim());
        }
        if let Some(status) = self.status {
            changes.insert("status", status.as_str());
        }
        if let Some(avatar_url) = self.avatar_url {
            changes.insert("avatar_url", avatar_url);
        }
        if let Some(preferences) = self.preferences {
            changes.insert("preferences", to_bson(&preferences)?);
        }
        Ok(changes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub campus: Option<Campus>,
    pub role: Option<UserRole>,
    pub department: Option<String>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}

// ---- courses ----

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(custom(function = "non_blank"), length(max = 20))]
    pub course_code: String,

    #[validate(custom(function = "non_blank"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub campus: Campus,

    #[validate(custom(function = "non_blank"))]
    pub department: String,

    #[validate(range(min = 1, max = 10, message = "Credits must be between 1 and 10"))]
    pub credits: i32,

    #[serde(default)]
    pub semester: Option<String>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,

    #[serde(default)]
    pub metadata: Option<CourseMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(custom(function = "non_blank"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(custom(function = "non_blank"))]
    pub department: Option<String>,
    pub semester: Option<String>,
    #[validate(range(min = 1, max = 10, message = "Credits must be between 1 and 10"))]
    pub credits: Option<i32>,
    pub status: Option<CourseStatus>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<CourseMetadata>,
}

impl UpdateCourseRequest {
    pub fn changes(self) -> AppResult<Document> {
        let mut changes = doc! {};
        if let Some(title) = self.title {
            changes.insert("title", title.trim());
        }
        if let Some(description) = self.description {
            changes.insert("description", description);
        }
        if let Some(department) = self.department {
            changes.insert("department", department.trim());
        }
        if let Some(semester) = self.semester {
            changes.insert("semester", semester);
        }
        if let Some(credits) = self.credits {
            changes.insert("credits", credits);
        }
        if let Some(status) = self.status {
            changes.insert("status", status.as_str());
        }
        if let Some(tags) = self.tags {
            changes.insert("tags", tags);
        }
        if let Some(metadata) = self.metadata {
            changes.insert("metadata", to_bson(&metadata)?);
        }
        Ok(changes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub campus: Option<Campus>,
    pub department: Option<String>,
    pub instructor_id: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    /// `limit || default`, capped at `max`.
    pub fn capped(&self, default: i64, max: i64) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit.min(max),
            _ => default,
        }
    }
}

// ---- materials ----

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FileInfoInput {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub original_name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size_bytes: i64,
    #[serde(default)]
    pub storage_path: String,
    #[validate(custom(function = "non_blank"))]
    pub checksum_md5: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMaterialRequest {
    #[validate(custom(function = "non_blank"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[validate(custom(function = "non_blank"))]
    pub course_id: String,

    #[serde(rename = "type")]
    pub material_type: MaterialType,

    #[validate(nested)]
    pub file_info: FileInfoInput,

    #[serde(default)]
    pub visibility: Option<Visibility>,

    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMaterialRequest {
    #[validate(custom(function = "non_blank"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub material_type: Option<MaterialType>,
    pub visibility: Option<Visibility>,
    pub tags: Option<Vec<String>>,
}

impl UpdateMaterialRequest {
    pub fn changes(self) -> Document {
        let mut changes = doc! {};
        if let Some(title) = self.title {
            changes.insert("title", title.trim());
        }
        if let Some(description) = self.description {
            changes.insert("description", description);
        }
        if let Some(material_type) = self.material_type {
            changes.insert("type", material_type.as_str());
        }
        if let Some(visibility) = self.visibility {
            changes.insert("visibility", visibility.as_str());
        }
        if let Some(tags) = self.tags {
            changes.insert("tags", tags);
        }
        changes
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MaterialListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub campus: Option<Campus>,
    pub department: Option<String>,
    pub course_id: Option<String>,
    #[serde(rename = "type")]
    pub material_type: Option<MaterialType>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckDuplicateRequest {
    #[serde(default)]
    pub checksum: Option<String>,
}

/// Text fields that accompany a multipart upload.
#[derive(Debug, Clone, Default)]
pub struct UploadFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub course_id: Option<String>,
    pub visibility: Option<Visibility>,
    pub tags: Vec<String>,
}

impl UploadFields {
    pub fn set(&mut self, name: &str, value: String) {
        match name {
            "title" => self.title = Some(value),
            "description" => self.description = Some(value),
            "course_id" => self.course_id = Some(value),
            "visibility" => self.visibility = value.parse().ok(),
            "tags" | "tags[]" => self.tags.extend(split_tags(&value)),
            _ => {}
        }
    }
}

pub fn split_tags(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

// ---- activities & stats ----

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub campus: Option<Campus>,
    pub action: Option<ActionType>,
    pub user_id: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyStatsQuery {
    pub days: Option<i64>,
}

// ---- pagination ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    /// `page >= 1`, `1 <= limit <= 100`, missing or zero values take defaults.
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p > 0 => p,
            _ => 1,
        };
        let limit = match limit {
            Some(l) if l != 0 => l.clamp(1, MAX_PAGE_LIMIT),
            _ => DEFAULT_PAGE_LIMIT,
        };
        Self { page, limit }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit).max(0) as u64
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}
