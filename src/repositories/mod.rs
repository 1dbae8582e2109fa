pub mod activity_repository;
pub mod course_repository;
pub mod material_repository;
pub mod refresh_token_repository;
pub mod stats_repository;
pub mod user_repository;

pub use activity_repository::{ActivityRepository, MongoActivityRepository};
pub use course_repository::{CourseRepository, MongoCourseRepository};
pub use material_repository::{MaterialRepository, MongoMaterialRepository};
pub use refresh_token_repository::{MongoRefreshTokenRepository, RefreshTokenRepository};
pub use stats_repository::{MongoStatsRepository, StatsRepository};
pub use user_repository::{MongoUserRepository, UserRepository};

use mongodb::{
    bson::{doc, Bson, DateTime, Document},
    error::{Error, ErrorKind, WriteError, WriteFailure},
};

/// True when an insert or replace collided with a unique index.
pub(crate) fn is_duplicate_key(err: &Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code: 11000, .. }))
    )
}

/// `$set` of `changes` plus a fresh `updated_at`. Fields not named are left alone.
pub(crate) fn set_fields(mut changes: Document) -> Document {
    changes.insert("updated_at", DateTime::now());
    doc! { "$set": changes }
}

/// Case-insensitive substring match over `fields`, with regex metacharacters escaped.
/// Blank input yields `None`.
pub(crate) fn search_clause(search: Option<&str>, fields: &[&str]) -> Option<Bson> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let pattern = doc! { "$regex": regex::escape(term), "$options": "i" };
    let clauses: Vec<Document> = fields
        .iter()
        .map(|field| {
            let mut clause = Document::new();
            clause.insert(*field, pattern.clone());
            clause
        })
        .collect();
    Some(Bson::from(clauses))
}
