use async_trait::async_trait;
use futures::TryStreamExt;
use log::info;
use mongodb::{
    bson::{doc, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::{
        domain::{Campus, Course, CourseStatus},
        dto::request::{CourseListQuery, Pagination},
    },
    repositories::{is_duplicate_key, search_clause, set_fields},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create(&self, course: Course) -> AppResult<Course>;
    async fn find_by_course_id(&self, course_id: &str) -> AppResult<Option<Course>>;
    async fn find_by_code(&self, course_code: &str) -> AppResult<Option<Course>>;
    /// Active courses only.
    async fn list(
        &self,
        query: &CourseListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Course>, i64)>;
    /// Active courses of `campus`, most enrolled first.
    async fn recommended(
        &self,
        campus: Campus,
        exclude_instructor: Option<String>,
        limit: i64,
    ) -> AppResult<Vec<Course>>;
    async fn update(&self, course_id: &str, changes: Document) -> AppResult<Course>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoCourseRepository {
    collection: Collection<Course>,
}

impl MongoCourseRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("courses");
        Self { collection }
    }
}

pub fn course_filter(query: &CourseListQuery) -> Document {
    let mut filter = doc! { "status": CourseStatus::Active.as_str() };
    if let Some(campus) = query.campus {
        filter.insert("campus", campus.as_str());
    }
    if let Some(department) = query.department.as_deref().filter(|d| !d.is_empty()) {
        filter.insert("department", department);
    }
    if let Some(instructor_id) = query.instructor_id.as_deref().filter(|i| !i.is_empty()) {
        filter.insert("instructor_id", instructor_id);
    }
    if let Some(clause) = search_clause(query.search.as_deref(), &["title", "course_code"]) {
        filter.insert("$or", clause);
    }
    filter
}

#[async_trait]
impl CourseRepository for MongoCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        match self.collection.insert_one(&course).await {
            Ok(_) => Ok(course),
            Err(err) if is_duplicate_key(&err) => {
                Err(AppError::AlreadyExists("Course code already exists".to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_course_id(&self, course_id: &str) -> AppResult<Option<Course>> {
        let course = self
            .collection
            .find_one(doc! { "course_id": course_id })
            .await?;
        Ok(course)
    }

    async fn find_by_code(&self, course_code: &str) -> AppResult<Option<Course>> {
        let course = self
            .collection
            .find_one(doc! { "course_code": course_code })
            .await?;
        Ok(course)
    }

    async fn list(
        &self,
        query: &CourseListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Course>, i64)> {
        let filter = course_filter(query);
        let total = self.collection.count_documents(filter.clone()).await?;

        let courses = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .skip(pagination.offset())
            .limit(pagination.limit)
            .await?
            .try_collect()
            .await?;

        Ok((courses, total as i64))
    }

    async fn recommended(
        &self,
        campus: Campus,
        exclude_instructor: Option<String>,
        limit: i64,
    ) -> AppResult<Vec<Course>> {
        let mut filter = doc! {
            "campus": campus.as_str(),
            "status": CourseStatus::Active.as_str(),
        };
        if let Some(instructor_id) = exclude_instructor {
            filter.insert("instructor_id", doc! { "$ne": instructor_id });
        }

        let courses = self
            .collection
            .find(filter)
            .sort(doc! { "enrollment_count": -1, "created_at": -1 })
            .limit(limit)
            .await?
            .try_collect()
            .await?;

        Ok(courses)
    }

    async fn update(&self, course_id: &str, changes: Document) -> AppResult<Course> {
        self.collection
            .find_one_and_update(doc! { "course_id": course_id }, set_fields(changes))
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let unique = IndexOptions::builder().unique(true).build();
        let course_id = IndexModel::builder()
            .keys(doc! { "course_id": 1 })
            .options(unique.clone())
            .build();
        let course_code = IndexModel::builder()
            .keys(doc! { "course_code": 1 })
            .options(unique)
            .build();
        let campus_department = IndexModel::builder()
            .keys(doc! { "campus": 1, "department": 1 })
            .build();

        self.collection
            .create_indexes(vec![course_id, course_code, campus_department])
            .await?;

        info!("Created indexes on courses (course_id, course_code, campus+department)");
        Ok(())
    }
}
