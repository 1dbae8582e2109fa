use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::domain::{
    common::{generate_id, Campus, MaterialType, Visibility},
    course::Course,
};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub storage_path: String,
    pub checksum_md5: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Rating {
    pub average: f64,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Material {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub material_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub course_id: String,
    pub course_code: String,
    pub campus: Campus,
    pub department: String,
    #[serde(rename = "type")]
    pub material_type: MaterialType,
    pub file_info: FileInfo,
    pub uploader_id: String,
    pub uploader_name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub download_count: i64,
    #[serde(default)]
    pub view_count: i64,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Material {
    /// Builds a material attached to `course`; campus, department and code
    /// are denormalised from it.
    pub fn for_course(
        course: &Course,
        title: &str,
        material_type: MaterialType,
        file_info: FileInfo,
        uploader_id: &str,
        uploader_name: &str,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            material_id: generate_id("MAT"),
            title: title.trim().to_string(),
            description: String::new(),
            course_id: course.course_id.clone(),
            course_code: course.course_code.clone(),
            campus: course.campus,
            department: course.department.clone(),
            material_type,
            file_info,
            uploader_id: uploader_id.to_string(),
            uploader_name: uploader_name.to_string(),
            visibility: Visibility::default(),
            download_count: 0,
            view_count: 0,
            rating: Rating::default(),
            tags: Vec::new(),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Download weight dominates; views count a tenth.
    pub fn engagement(&self) -> f64 {
        self.download_count as f64 + self.view_count as f64 * 0.1
    }
}
