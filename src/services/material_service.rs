use std::{path::PathBuf, sync::Arc};

use mongodb::bson::doc;
use validator::Validate;

use crate::{
    auth::{require_owner_or_admin, Claims},
    errors::{AppError, AppResult},
    models::{
        domain::{ActionType, Activity, ActivityMetadata, FileInfo, Material, TargetType},
        dto::{
            request::{
                CheckDuplicateRequest, CreateMaterialRequest, MaterialListQuery, Pagination,
                UpdateMaterialRequest, UploadFields,
            },
            response::{DuplicateCheckDto, MaterialDto, MaterialSummaryDto, Page},
        },
    },
    repositories::{CourseRepository, MaterialRepository, UserRepository},
    services::{
        activity_service::ActivityService,
        storage::{FileStorage, StoredFile},
    },
};

pub const FILE_MISSING: &str = "File does not exist on the server. Please contact an administrator.";

/// Everything the download handler needs to stream a stored file.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTicket {
    pub path: PathBuf,
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: i64,
}

pub struct MaterialService {
    materials: Arc<dyn MaterialRepository>,
    courses: Arc<dyn CourseRepository>,
    users: Arc<dyn UserRepository>,
    activities: Arc<ActivityService>,
    storage: Arc<FileStorage>,
}

impl MaterialService {
    pub fn new(
        materials: Arc<dyn MaterialRepository>,
        courses: Arc<dyn CourseRepository>,
        users: Arc<dyn UserRepository>,
        activities: Arc<ActivityService>,
        storage: Arc<FileStorage>,
    ) -> Self {
        Self {
            materials,
            courses,
            users,
            activities,
            storage,
        }
    }

    pub async fn list(&self, query: MaterialListQuery) -> AppResult<Page<MaterialDto>> {
        let pagination = Pagination::new(query.page, query.limit);
        let (materials, total) = self.materials.list(&query, pagination).await?;
        Ok(Page::new(materials, pagination, total).map(MaterialDto::from))
    }

    /// Returns the material as it was before this view was counted.
    pub async fn get(
        &self,
        material_id: &str,
        viewer: Option<&Claims>,
        metadata: ActivityMetadata,
    ) -> AppResult<MaterialDto> {
        let material = self.find(material_id).await?;
        self.materials.increment_views(material_id).await?;

        if let Some(claims) = viewer {
            self.record(claims, ActionType::View, &material, metadata).await;
        }

        Ok(material.into())
    }

    /// Registers a file that is already in storage.
    pub async fn create(
        &self,
        claims: &Claims,
        request: CreateMaterialRequest,
        metadata: ActivityMetadata,
    ) -> AppResult<MaterialDto> {
        request.validate()?;

        let course = self
            .courses
            .find_by_course_id(request.course_id.trim())
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        let input = request.file_info;
        self.reject_duplicate(&input.checksum_md5).await?;

        let file_info = FileInfo {
            filename: input.filename,
            original_name: input.original_name,
            mime_type: input.mime_type,
            size_bytes: input.size_bytes,
            storage_path: input.storage_path,
            checksum_md5: input.checksum_md5,
        };

        let uploader_name = self.display_name(claims).await?;
        let mut material = Material::for_course(
            &course,
            &request.title,
            request.material_type,
            file_info,
            claims.user_id(),
            &uploader_name,
        );
        if let Some(description) = request.description {
            material.description = description;
        }
        if let Some(visibility) = request.visibility {
            material.visibility = visibility;
        }
        if let Some(tags) = request.tags {
            material.tags = tags;
        }

        let material = self.materials.create(material).await?;
        self.record_upload(claims, &material, metadata).await;

        log::info!("Registered material {} for {}", material.material_id, material.course_code);
        Ok(material.into())
    }

    /// Attaches a freshly stored upload to a course. The stored file is
    /// deleted again if the material cannot be created.
    pub async fn upload(
        &self,
        claims: &Claims,
        fields: UploadFields,
        file: Option<StoredFile>,
        metadata: ActivityMetadata,
    ) -> AppResult<MaterialDto> {
        let file = file.ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

        match self.attach_upload(claims, fields, &file, metadata).await {
            Ok(material) => Ok(material),
            Err(err) => {
                self.storage.remove(&file.path).await;
                Err(err)
            }
        }
    }

    async fn attach_upload(
        &self,
        claims: &Claims,
        fields: UploadFields,
        file: &StoredFile,
        metadata: ActivityMetadata,
    ) -> AppResult<MaterialDto> {
        let title = fields.title.as_deref().map(str::trim).unwrap_or_default();
        let course_id = fields.course_id.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || course_id.is_empty() {
            return Err(AppError::BadRequest(
                "Title and course_id are required".to_string(),
            ));
        }

        let course = self
            .courses
            .find_by_course_id(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;

        self.reject_duplicate(&file.checksum_md5).await?;

        let uploader_name = self.display_name(claims).await?;
        let mut material = Material::for_course(
            &course,
            title,
            file.category.material_type(),
            file.file_info(),
            claims.user_id(),
            &uploader_name,
        );
        material.description = fields.description.unwrap_or_default();
        material.tags = fields.tags;
        if let Some(visibility) = fields.visibility {
            material.visibility = visibility;
        }

        let material = self.materials.create(material).await?;
        self.record_upload(claims, &material, metadata).await;

        log::info!(
            "Stored upload {} ({} bytes) as {}",
            material.file_info.original_name,
            material.file_info.size_bytes,
            material.material_id
        );
        Ok(material.into())
    }

    pub async fn check_duplicate(
        &self,
        request: CheckDuplicateRequest,
    ) -> AppResult<DuplicateCheckDto> {
        let checksum = request
            .checksum
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Checksum required".to_string()))?;

        let existing = self.materials.find_by_checksum(checksum.trim()).await?;
        Ok(DuplicateCheckDto {
            is_duplicate: existing.is_some(),
            existing: existing.as_ref().map(MaterialSummaryDto::from),
        })
    }

    pub async fn update(
        &self,
        claims: &Claims,
        material_id: &str,
        request: UpdateMaterialRequest,
    ) -> AppResult<MaterialDto> {
        request.validate()?;

        let material = self.find(material_id).await?;
        require_owner_or_admin(claims, &material.uploader_id)?;

        let material = self
            .materials
            .update(material_id, request.changes())
            .await?;
        log::info!("Updated material {}", material.material_id);
        Ok(material.into())
    }

    /// Soft delete. The file stays on disk.
    pub async fn delete(&self, claims: &Claims, material_id: &str) -> AppResult<()> {
        let material = self.find(material_id).await?;
        require_owner_or_admin(claims, &material.uploader_id)?;

        self.materials
            .update(material_id, doc! { "is_deleted": true })
            .await?;

        log::info!("Deleted material {}", material_id);
        Ok(())
    }

    /// Counts the download and hands back the file location.
    pub async fn download(
        &self,
        claims: &Claims,
        material_id: &str,
        metadata: ActivityMetadata,
    ) -> AppResult<DownloadTicket> {
        let material = self.find(material_id).await?;

        let path = PathBuf::from(&material.file_info.storage_path);
        if !self.storage.exists(&path).await {
            log::warn!(
                "Material {} points at missing file {}",
                material.material_id,
                path.display()
            );
            return Err(AppError::NotFound(FILE_MISSING.to_string()));
        }

        self.materials.increment_downloads(material_id).await?;
        self.record(
            claims,
            ActionType::Download,
            &material,
            ActivityMetadata {
                file_size_bytes: Some(material.file_info.size_bytes),
                ..metadata
            },
        )
        .await;

        Ok(DownloadTicket {
            path,
            original_name: material.file_info.original_name,
            mime_type: material.file_info.mime_type,
            size_bytes: material.file_info.size_bytes,
        })
    }

    async fn find(&self, material_id: &str) -> AppResult<Material> {
        self.materials
            .find_by_material_id(material_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))
    }

    async fn reject_duplicate(&self, checksum: &str) -> AppResult<()> {
        match self.materials.find_by_checksum(checksum).await? {
            Some(existing) => Err(AppError::DuplicateMaterial(MaterialSummaryDto::from(
                &existing,
            ))),
            None => Ok(()),
        }
    }

    async fn display_name(&self, claims: &Claims) -> AppResult<String> {
        Ok(self
            .users
            .find_by_user_id(claims.user_id())
            .await?
            .map(|u| u.full_name)
            .unwrap_or_else(|| claims.email.clone()))
    }

    async fn record_upload(&self, claims: &Claims, material: &Material, metadata: ActivityMetadata) {
        let metadata = ActivityMetadata {
            file_size_bytes: Some(material.file_info.size_bytes),
            file_type: Some(material.file_info.mime_type.clone()),
            ..metadata
        };
        self.record(claims, ActionType::Upload, material, metadata).await;
    }

    async fn record(
        &self,
        claims: &Claims,
        action: ActionType,
        material: &Material,
        metadata: ActivityMetadata,
    ) {
        let user_name = match self.display_name(claims).await {
            Ok(name) => name,
            Err(_) => claims.email.clone(),
        };
        let activity = Activity::new(
            claims.user_id(),
            &user_name,
            claims.campus,
            action,
            TargetType::Material,
            &material.material_id,
            &material.title,
        )
        .with_metadata(metadata);
        self.activities.record(activity).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::domain::{Campus, UserRole},
        repositories::{
            activity_repository::MockActivityRepository,
            course_repository::MockCourseRepository,
            material_repository::MockMaterialRepository, user_repository::MockUserRepository,
        },
        test_utils::fixtures::{claims_for, test_course, test_material, test_user},
    };
    use actix_web::web::Bytes;
    use futures::stream;

    fn service(
        materials: MockMaterialRepository,
        activities: MockActivityRepository,
    ) -> MaterialService {
        let root = std::env::temp_dir().join(format!("smartlearn-{}", uuid::Uuid::new_v4()));
        MaterialService::new(
            Arc::new(materials),
            Arc::new(MockCourseRepository::new()),
            Arc::new(MockUserRepository::new()),
            Arc::new(ActivityService::new(Arc::new(activities))),
            Arc::new(FileStorage::new(root)),
        )
    }

    #[tokio::test]
    async fn test_anonymous_view_counts_without_activity() {
        let lecturer = test_user(UserRole::Lecturer, Campus::Hanoi);
        let material = test_material(&test_course(Campus::Hanoi, &lecturer), &lecturer, "abc");
        let id = material.material_id.clone();

        let mut materials = MockMaterialRepository::new();
        materials
            .expect_find_by_material_id()
            .returning(move |_| Ok(Some(material.clone())));
        let expected = id.clone();
        materials
            .expect_increment_views()
            .withf(move |material_id| material_id == expected)
            .times(1)
            .returning(|_| Ok(()));
        let mut activities = MockActivityRepository::new();
        activities.expect_create().never();

        let dto = service(materials, activities)
            .get(&id, None, ActivityMetadata::default())
            .await
            .unwrap();
        assert_eq!(dto.material_id, id);
        assert_eq!(dto.view_count, 0);
    }

    #[tokio::test]
    async fn test_student_cannot_delete_upload() {
        let lecturer = test_user(UserRole::Lecturer, Campus::Danang);
        let student = test_user(UserRole::Student, Campus::Danang);
        let material = test_material(&test_course(Campus::Danang, &lecturer), &lecturer, "abc");

        let mut materials = MockMaterialRepository::new();
        materials
            .expect_find_by_material_id()
            .returning(move |_| Ok(Some(material.clone())));
        materials.expect_update().never();

        let result = service(materials, MockActivityRepository::new())
            .delete(&claims_for(&student), "MAT1")
            .await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_update_leaves_counters_to_the_store() {
        let lecturer = test_user(UserRole::Lecturer, Campus::Hanoi);
        let mut material = test_material(&test_course(Campus::Hanoi, &lecturer), &lecturer, "abc");
        material.view_count = 5;
        material.download_count = 2;
        let stored = material.clone();

        let mut materials = MockMaterialRepository::new();
        materials
            .expect_find_by_material_id()
            .returning(move |_| Ok(Some(material.clone())));
        materials
            .expect_update()
            .withf(|_, changes| {
                changes.keys().eq(["title", "tags"])
                    && changes.get_str("title").ok() == Some("Week 2")
            })
            .times(1)
            .returning(move |_, _| {
                let mut updated = stored.clone();
                updated.title = "Week 2".to_string();
                updated.view_count = 6;
                Ok(updated)
            });

        let dto = service(materials, MockActivityRepository::new())
            .update(
                &claims_for(&lecturer),
                "MAT1",
                UpdateMaterialRequest {
                    title: Some(" Week 2 ".to_string()),
                    tags: Some(vec!["calculus".to_string()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(dto.title, "Week 2");
        assert_eq!(dto.view_count, 6);
        assert_eq!(dto.download_count, 2);
    }

    #[tokio::test]
    async fn test_download_of_missing_file() {
        let lecturer = test_user(UserRole::Lecturer, Campus::Hcm);
        let material = test_material(&test_course(Campus::Hcm, &lecturer), &lecturer, "abc");

        let mut materials = MockMaterialRepository::new();
        materials
            .expect_find_by_material_id()
            .returning(move |_| Ok(Some(material.clone())));
        materials.expect_increment_downloads().never();

        let result = service(materials, MockActivityRepository::new())
            .download(&claims_for(&lecturer), "MAT1", ActivityMetadata::default())
            .await;
        match result {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, FILE_MISSING),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rejected_upload_is_removed_from_disk() {
        let lecturer = test_user(UserRole::Lecturer, Campus::Hanoi);
        let service = service(MockMaterialRepository::new(), MockActivityRepository::new());

        let chunks = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"%PDF"))]);
        let stored = service
            .storage
            .store("notes.pdf", "application/pdf", chunks)
            .await
            .unwrap();
        assert!(service.storage.exists(&stored.path).await);

        let result = service
            .upload(
                &claims_for(&lecturer),
                UploadFields::default(),
                Some(stored.clone()),
                ActivityMetadata::default(),
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert!(!service.storage.exists(&stored.path).await);
    }
}
