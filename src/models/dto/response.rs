use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    domain::{
        Activity, ActivityMetadata, ActionType, Campus, Course, CourseMetadata, CourseStatus,
        Material, MaterialType, Rating, TargetType, User, UserPreferences, UserRole, UserStatus,
        Visibility,
    },
    dto::request::Pagination,
};

/// Success envelope shared by every route.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
        }
    }

    pub fn with_message(data: T, message: &str) -> Self {
        Self {
            message: Some(message.to_string()),
            ..Self::ok(data)
        }
    }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
    pub fn paginated(page: Page<T>) -> Self {
        Self {
            success: true,
            data: Some(page.items),
            message: None,
            pagination: Some(page.meta),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.to_string()),
            pagination: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(pagination: Pagination, total: i64) -> Self {
        let total_pages = (total + pagination.limit - 1) / pagination.limit;
        Self {
            page: pagination.page,
            limit: pagination.limit,
            total,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }
}

/// One page of results plus its metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PaginationMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, pagination: Pagination, total: i64) -> Self {
        Self {
            items,
            meta: PaginationMeta::new(pagination, total),
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub user_id: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub campus: Campus,
    pub department: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub status: UserStatus,
    pub preferences: UserPreferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        UserDto {
            user_id: user.user_id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            campus: user.campus,
            department: user.department,
            avatar_url: user.avatar_url,
            last_login: user.last_login.map(|dt| dt.to_chrono()),
            status: user.status,
            preferences: user.preferences,
            created_at: user.created_at.to_chrono(),
            updated_at: user.updated_at.to_chrono(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseDto {
    pub course_id: String,
    pub course_code: String,
    pub title: String,
    pub description: String,
    pub campus: Campus,
    pub department: String,
    pub instructor_id: String,
    pub instructor_name: String,
    pub semester: String,
    pub credits: i32,
    pub status: CourseStatus,
    pub enrollment_count: i64,
    pub tags: Vec<String>,
    pub metadata: CourseMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Course> for CourseDto {
    fn from(course: Course) -> Self {
        CourseDto {
            course_id: course.course_id,
            course_code: course.course_code,
            title: course.title,
            description: course.description,
            campus: course.campus,
            department: course.department,
            instructor_id: course.instructor_id,
            instructor_name: course.instructor_name,
            semester: course.semester,
            credits: course.credits,
            status: course.status,
            enrollment_count: course.enrollment_count,
            tags: course.tags,
            metadata: course.metadata,
            created_at: course.created_at.to_chrono(),
            updated_at: course.updated_at.to_chrono(),
        }
    }
}

/// File details exposed to clients; the on-disk path stays server side.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfoDto {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub checksum_md5: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaterialDto {
    pub material_id: String,
    pub title: String,
    pub description: String,
    pub course_id: String,
    pub course_code: String,
    pub campus: Campus,
    pub department: String,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub file_info: FileInfoDto,
    pub uploader_id: String,
    pub uploader_name: String,
    pub visibility: Visibility,
    pub download_count: i64,
    pub view_count: i64,
    pub rating: Rating,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Material> for MaterialDto {
    fn from(material: Material) -> Self {
        MaterialDto {
            material_id: material.material_id,
            title: material.title,
            description: material.description,
            course_id: material.course_id,
            course_code: material.course_code,
            campus: material.campus,
            department: material.department,
            material_type: material.material_type,
            file_info: FileInfoDto {
                filename: material.file_info.filename,
                original_name: material.file_info.original_name,
                mime_type: material.file_info.mime_type,
                size_bytes: material.file_info.size_bytes,
                checksum_md5: material.file_info.checksum_md5,
            },
            uploader_id: material.uploader_id,
            uploader_name: material.uploader_name,
            visibility: material.visibility,
            download_count: material.download_count,
            view_count: material.view_count,
            rating: material.rating,
            tags: material.tags,
            created_at: material.created_at.to_chrono(),
            updated_at: material.updated_at.to_chrono(),
        }
    }
}

/// Identifies an existing material when a duplicate upload is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialSummaryDto {
    pub material_id: String,
    pub title: String,
    pub course_code: String,
}

impl From<&Material> for MaterialSummaryDto {
    fn from(material: &Material) -> Self {
        MaterialSummaryDto {
            material_id: material.material_id.clone(),
            title: material.title.clone(),
            course_code: material.course_code.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateCheckDto {
    pub is_duplicate: bool,
    pub existing: Option<MaterialSummaryDto>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityDto {
    pub activity_id: String,
    pub user_id: String,
    pub user_name: String,
    pub campus: Campus,
    pub action: ActionType,
    pub target_type: TargetType,
    pub target_id: String,
    pub target_title: String,
    pub metadata: ActivityMetadata,
    pub timestamp: DateTime<Utc>,
    pub date: String,
    pub hour: i32,
}

impl From<Activity> for ActivityDto {
    fn from(activity: Activity) -> Self {
        ActivityDto {
            activity_id: activity.activity_id,
            user_id: activity.user_id,
            user_name: activity.user_name,
            campus: activity.campus,
            action: activity.action,
            target_type: activity.target_type,
            target_id: activity.target_id,
            target_title: activity.target_title,
            metadata: activity.metadata,
            timestamp: activity.timestamp.to_chrono(),
            date: activity.date,
            hour: activity.hour,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairDto {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserDto,
}
