#[cfg(test)]
pub mod fixtures {
    use std::{sync::Arc, time::Duration};

    use crate::{
        app_state::{AppState, Repositories},
        auth::Claims,
        config::Config,
        models::domain::{Campus, Course, FileInfo, Material, MaterialType, User, UserRole},
        repositories::{
            activity_repository::MockActivityRepository, course_repository::MockCourseRepository,
            material_repository::MockMaterialRepository,
            refresh_token_repository::MockRefreshTokenRepository,
            stats_repository::MockStatsRepository, user_repository::MockUserRepository,
        },
    };

    /// State over expectation-free mocks and no database.
    pub fn mock_state() -> AppState {
        let repositories = Repositories {
            users: Arc::new(MockUserRepository::new()),
            courses: Arc::new(MockCourseRepository::new()),
            materials: Arc::new(MockMaterialRepository::new()),
            activities: Arc::new(MockActivityRepository::new()),
            refresh_tokens: Arc::new(MockRefreshTokenRepository::new()),
            stats: Arc::new(MockStatsRepository::new()),
        };
        AppState::build(Config::test_config(), repositories, None)
    }

    /// An active user with a placeholder hash.
    pub fn test_user(role: UserRole, campus: Campus) -> User {
        User::test_user(&format!("{}@hnue.edu.vn", role), role, campus)
    }

    /// Claims as the auth middleware would produce them for `user`.
    pub fn claims_for(user: &User) -> Claims {
        Claims::new(user, Duration::from_secs(15 * 60))
    }

    pub fn test_course(campus: Campus, instructor: &User) -> Course {
        Course::new(
            "IT101",
            "Introduction to Programming",
            campus,
            "Information Technology",
            &instructor.user_id,
            &instructor.full_name,
            3,
        )
    }

    pub fn test_file(checksum: &str) -> FileInfo {
        FileInfo {
            filename: "1700000000000-42.pdf".to_string(),
            original_name: "lecture-01.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size_bytes: 2048,
            storage_path: "uploads/materials/2024/01/1700000000000-42.pdf".to_string(),
            checksum_md5: checksum.to_string(),
        }
    }

    pub fn test_material(course: &Course, uploader: &User, checksum: &str) -> Material {
        Material::for_course(
            course,
            "Lecture 1",
            MaterialType::Document,
            test_file(checksum),
            &uploader.user_id,
            &uploader.full_name,
        )
    }
}

#[cfg(test)]
pub mod test_helpers {
    use actix_web::http::StatusCode;

    /// Asserts that a status code represents an error (4xx or 5xx)
    pub fn assert_error_status(status: StatusCode) {
        assert!(
            status.is_client_error() || status.is_server_error(),
            "Expected error status, got: {}",
            status
        );
    }

    /// Asserts that a status code represents success (2xx)
    pub fn assert_success_status(status: StatusCode) {
        assert!(
            status.is_success(),
            "Expected success status, got: {}",
            status
        );
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use crate::models::domain::{Campus, UserRole};

    #[test]
    fn test_fixtures_build_a_consistent_graph() {
        let lecturer = test_user(UserRole::Lecturer, Campus::Danang);
        let course = test_course(Campus::Danang, &lecturer);
        let material = test_material(&course, &lecturer, "abc123");

        assert_eq!(lecturer.email, "lecturer@hnue.edu.vn");
        assert_eq!(course.instructor_id, lecturer.user_id);
        assert_eq!(material.course_code, "IT101");
        assert_eq!(material.campus, Campus::Danang);
        assert_eq!(material.uploader_id, lecturer.user_id);
    }

    #[test]
    fn test_claims_for_user() {
        let admin = test_user(UserRole::Admin, Campus::Hanoi);
        let claims = claims_for(&admin);

        assert_eq!(claims.user_id(), admin.user_id);
        assert!(claims.is_admin());
    }
}
