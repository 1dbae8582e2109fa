use std::sync::Arc;

use mongodb::bson::doc;
use validator::Validate;

use crate::{
    auth::{require_owner_or_admin, Claims},
    errors::{AppError, AppResult},
    models::{
        domain::{course::normalize_course_code, Course, CourseStatus, UserRole},
        dto::{
            request::{
                CourseListQuery, CreateCourseRequest, LimitQuery, Pagination, UpdateCourseRequest,
            },
            response::{CourseDto, Page},
        },
    },
    repositories::{CourseRepository, UserRepository},
};

pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    users: Arc<dyn UserRepository>,
}

impl CourseService {
    pub fn new(courses: Arc<dyn CourseRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { courses, users }
    }

    pub async fn list(&self, query: CourseListQuery) -> AppResult<Page<CourseDto>> {
        let pagination = Pagination::new(query.page, query.limit);
        let (courses, total) = self.courses.list(&query, pagination).await?;
        Ok(Page::new(courses, pagination, total).map(CourseDto::from))
    }

    /// Active courses on the caller's campus. Lecturers do not get their own courses back.
    pub async fn recommended(&self, claims: &Claims, query: LimitQuery) -> AppResult<Vec<CourseDto>> {
        let exclude = (claims.role == UserRole::Lecturer).then(|| claims.sub.clone());
        let courses = self
            .courses
            .recommended(claims.campus, exclude, query.capped(5, 10))
            .await?;
        Ok(courses.into_iter().map(CourseDto::from).collect())
    }

    pub async fn get(&self, course_id: &str) -> AppResult<CourseDto> {
        self.find(course_id).await.map(CourseDto::from)
    }

    pub async fn create(&self, claims: &Claims, request: CreateCourseRequest) -> AppResult<CourseDto> {
        request.validate()?;

        let code = normalize_course_code(&request.course_code);
        if self.courses.find_by_code(&code).await?.is_some() {
            return Err(AppError::AlreadyExists("Course code already exists".to_string()));
        }

        let instructor_name = self
            .users
            .find_by_user_id(claims.user_id())
            .await?
            .map(|u| u.full_name)
            .unwrap_or_else(|| "Unknown".to_string());

        let mut course = Course::new(
            &code,
            &request.title,
            request.campus,
            &request.department,
            claims.user_id(),
            &instructor_name,
            request.credits,
        );
        if let Some(description) = request.description {
            course.description = description;
        }
        if let Some(semester) = request.semester.filter(|s| !s.trim().is_empty()) {
            course.semester = semester;
        }
        if let Some(tags) = request.tags {
            course.tags = tags;
        }
        if let Some(metadata) = request.metadata {
            course.metadata = metadata;
        }

        let course = self.courses.create(course).await?;
        log::info!("Created course {} ({})", course.course_code, course.course_id);
        Ok(course.into())
    }

    pub async fn update(
        &self,
        claims: &Claims,
        course_id: &str,
        request: UpdateCourseRequest,
    ) -> AppResult<CourseDto> {
        request.validate()?;

        let course = self.find(course_id).await?;
        require_owner_or_admin(claims, &course.instructor_id)?;

        let course = self
            .courses
            .update(course_id, request.changes()?)
            .await?;
        log::info!("Updated course {}", course.course_id);
        Ok(course.into())
    }

    /// Soft delete: the course is marked inactive.
    pub async fn delete(&self, course_id: &str) -> AppResult<()> {
        self.courses
            .update(course_id, doc! { "status": CourseStatus::Inactive.as_str() })
            .await?;

        log::info!("Deactivated course {}", course_id);
        Ok(())
    }

    async fn find(&self, course_id: &str) -> AppResult<Course> {
        self.courses
            .find_by_course_id(course_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
    }
}
