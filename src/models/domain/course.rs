use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::domain::common::{generate_id, Campus, CourseStatus};

pub const DEFAULT_SEMESTER: &str = "2024-2";

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CourseMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syllabus_url: Option<String>,
    pub max_students: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
}

impl Default for CourseMetadata {
    fn default() -> Self {
        Self {
            syllabus_url: None,
            max_students: 50,
            schedule: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Course {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub course_id: String,
    pub course_code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub campus: Campus,
    pub department: String,
    pub instructor_id: String,
    pub instructor_name: String,
    pub semester: String,
    pub credits: i32,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(default)]
    pub enrollment_count: i64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: CourseMetadata,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Course {
    pub fn new(
        course_code: &str,
        title: &str,
        campus: Campus,
        department: &str,
        instructor_id: &str,
        instructor_name: &str,
        credits: i32,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            course_id: generate_id("CRS"),
            course_code: normalize_course_code(course_code),
            title: title.trim().to_string(),
            description: String::new(),
            campus,
            department: department.trim().to_string(),
            instructor_id: instructor_id.to_string(),
            instructor_name: instructor_name.to_string(),
            semester: DEFAULT_SEMESTER.to_string(),
            credits,
            status: CourseStatus::Active,
            enrollment_count: 0,
            tags: Vec::new(),
            metadata: CourseMetadata::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CourseStatus::Active
    }
}

pub fn normalize_course_code(code: &str) -> String {
    code.trim().to_uppercase()
}
