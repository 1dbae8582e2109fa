use async_trait::async_trait;
use futures::TryStreamExt;
use log::info;
use mongodb::{
    bson::{doc, from_document, DateTime, Document},
    options::{IndexOptions, ReturnDocument},
    Collection, IndexModel,
};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::{
        domain::Material,
        dto::request::{MaterialListQuery, Pagination},
    },
    repositories::{search_clause, set_fields},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MaterialRepository: Send + Sync {
    async fn create(&self, material: Material) -> AppResult<Material>;
    /// Non-deleted material by id.
    async fn find_by_material_id(&self, material_id: &str) -> AppResult<Option<Material>>;
    /// Non-deleted material carrying this MD5.
    async fn find_by_checksum(&self, checksum: &str) -> AppResult<Option<Material>>;
    async fn list(
        &self,
        query: &MaterialListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Material>, i64)>;
    async fn increment_views(&self, material_id: &str) -> AppResult<()>;
    async fn increment_downloads(&self, material_id: &str) -> AppResult<()>;
    async fn update(&self, material_id: &str, changes: Document) -> AppResult<Material>;
    /// Non-deleted materials ordered by `download_count + 0.1 * view_count`.
    async fn top_by_engagement(&self, limit: i64) -> AppResult<Vec<Material>>;
    async fn ensure_indexes(&self) -> AppResult<()>;
}

pub struct MongoMaterialRepository {
    collection: Collection<Material>,
}

impl MongoMaterialRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection("materials");
        Self { collection }
    }

    async fn increment(&self, material_id: &str, field: &str) -> AppResult<()> {
        let mut inc = Document::new();
        inc.insert(field, 1_i64);
        self.collection
            .update_one(
                doc! { "material_id": material_id, "is_deleted": false },
                doc! { "$inc": inc, "$set": { "updated_at": DateTime::now() } },
            )
            .await?;
        Ok(())
    }
}

pub fn material_filter(query: &MaterialListQuery) -> Document {
    let mut filter = doc! { "is_deleted": false };
    if let Some(campus) = query.campus {
        filter.insert("campus", campus.as_str());
    }
    if let Some(department) = query.department.as_deref().filter(|d| !d.is_empty()) {
        filter.insert("department", department);
    }
    if let Some(course_id) = query.course_id.as_deref().filter(|c| !c.is_empty()) {
        filter.insert("course_id", course_id);
    }
    if let Some(material_type) = query.material_type {
        filter.insert("type", material_type.as_str());
    }
    if let Some(clause) = search_clause(query.search.as_deref(), &["title", "description"]) {
        filter.insert("$or", clause);
    }
    filter
}

#[async_trait]
impl MaterialRepository for MongoMaterialRepository {
    async fn create(&self, material: Material) -> AppResult<Material> {
        self.collection.insert_one(&material).await?;
        Ok(material)
    }

    async fn find_by_material_id(&self, material_id: &str) -> AppResult<Option<Material>> {
        let material = self
            .collection
            .find_one(doc! { "material_id": material_id, "is_deleted": false })
            .await?;
        Ok(material)
    }

    async fn find_by_checksum(&self, checksum: &str) -> AppResult<Option<Material>> {
        let material = self
            .collection
            .find_one(doc! { "file_info.checksum_md5": checksum, "is_deleted": false })
            .await?;
        Ok(material)
    }

    async fn list(
        &self,
        query: &MaterialListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Material>, i64)> {
        let filter = material_filter(query);
        let total = self.collection.count_documents(filter.clone()).await?;

        let materials = self
            .collection
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .skip(pagination.offset())
            .limit(pagination.limit)
            .await?
            .try_collect()
            .await?;

        Ok((materials, total as i64))
    }

    async fn increment_views(&self, material_id: &str) -> AppResult<()> {
        self.increment(material_id, "view_count").await
    }

    async fn increment_downloads(&self, material_id: &str) -> AppResult<()> {
        self.increment(material_id, "download_count").await
    }

    async fn update(&self, material_id: &str, changes: Document) -> AppResult<Material> {
        self.collection
            .find_one_and_update(doc! { "material_id": material_id }, set_fields(changes))
            .return_document(ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))
    }

    async fn top_by_engagement(&self, limit: i64) -> AppResult<Vec<Material>> {
        let pipeline = vec![
            doc! { "$match": { "is_deleted": false } },
            doc! { "$addFields": {
                "engagement": {
                    "$add": ["$download_count", { "$multiply": ["$view_count", 0.1] }]
                }
            } },
            doc! { "$sort": { "engagement": -1 } },
            doc! { "$limit": limit },
            doc! { "$project": { "engagement": 0 } },
        ];

        let docs: Vec<Document> = self.collection.aggregate(pipeline).await?.try_collect().await?;
        docs.into_iter()
            .map(|d| from_document(d).map_err(AppError::from))
            .collect()
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        let material_id = IndexModel::builder()
            .keys(doc! { "material_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let campus_course = IndexModel::builder()
            .keys(doc! { "campus": 1, "course_id": 1 })
            .build();
        let course_type = IndexModel::builder()
            .keys(doc! { "course_id": 1, "type": 1 })
            .build();
        let checksum = IndexModel::builder()
            .keys(doc! { "file_info.checksum_md5": 1 })
            .build();

        self.collection
            .create_indexes(vec![material_id, campus_course, course_type, checksum])
            .await?;

        info!("Created indexes on materials (material_id, campus+course_id, course_id+type, checksum)");
        Ok(())
    }
}
