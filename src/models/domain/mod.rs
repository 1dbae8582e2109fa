pub mod activity;
pub mod common;
pub mod course;
pub mod material;
pub mod refresh_token;
pub mod user;

pub use activity::{Activity, ActivityMetadata};
pub use common::{
    generate_id, ActionType, Campus, CourseStatus, MaterialType, TargetType, UserRole,
    UserStatus, Visibility,
};
pub use course::{Course, CourseMetadata};
pub use material::{FileInfo, Material, Rating};
pub use refresh_token::RefreshToken;
pub use user::{User, UserPreferences};
