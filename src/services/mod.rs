pub mod activity_service;
pub mod auth_service;
pub mod course_service;
pub mod material_service;
pub mod stats_service;
pub mod storage;
pub mod user_service;
