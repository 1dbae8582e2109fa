use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::models::domain::common::{generate_id, Campus, UserRole, UserStatus};

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct UserPreferences {
    pub language: String,
    pub notifications: bool,
    pub theme: String,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            language: "vi".to_string(),
            notifications: true,
            theme: "light".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    #[serde(default)]
    pub role: UserRole,
    pub campus: Campus,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime>,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub preferences: UserPreferences,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    /// Builds an active user. `password_hash` must already be hashed.
    pub fn new(
        email: &str,
        password_hash: String,
        full_name: &str,
        role: UserRole,
        campus: Campus,
        department: &str,
    ) -> Self {
        let now = DateTime::now();
        Self {
            id: None,
            user_id: generate_id("USR"),
            email: normalize_email(email),
            password_hash,
            full_name: full_name.trim().to_string(),
            role,
            campus,
            department: department.trim().to_string(),
            avatar_url: None,
            last_login: None,
            status: UserStatus::Active,
            preferences: UserPreferences::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
impl User {
    pub fn test_user(email: &str, role: UserRole, campus: Campus) -> Self {
        User::new(
            email,
            "$2b$04$testhashtesthashtesthashtesthashtesthashtesthashtesth".to_string(),
            "Test User",
            role,
            campus,
            "Computer Science",
        )
    }
}
