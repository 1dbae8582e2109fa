use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::{AppError, AppResult},
    repositories::{
        ActivityRepository, CourseRepository, MaterialRepository, MongoActivityRepository,
        MongoCourseRepository, MongoMaterialRepository, MongoRefreshTokenRepository,
        MongoStatsRepository, MongoUserRepository, RefreshTokenRepository, StatsRepository,
        UserRepository,
    },
    services::{
        activity_service::ActivityService, auth_service::AuthService,
        course_service::CourseService, material_service::MaterialService,
        stats_service::StatsService, storage::FileStorage, user_service::UserService,
    },
};

/// One handle per collection.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub materials: Arc<dyn MaterialRepository>,
    pub activities: Arc<dyn ActivityRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub stats: Arc<dyn StatsRepository>,
}

impl Repositories {
    pub fn mongo(db: &Database) -> Self {
        Self {
            users: Arc::new(MongoUserRepository::new(db)),
            courses: Arc::new(MongoCourseRepository::new(db)),
            materials: Arc::new(MongoMaterialRepository::new(db)),
            activities: Arc::new(MongoActivityRepository::new(db)),
            refresh_tokens: Arc::new(MongoRefreshTokenRepository::new(db)),
            stats: Arc::new(MongoStatsRepository::new(db)),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        self.users.ensure_indexes().await?;
        self.courses.ensure_indexes().await?;
        self.materials.ensure_indexes().await?;
        self.activities.ensure_indexes().await?;
        self.refresh_tokens.ensure_indexes().await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub user_service: Arc<UserService>,
    pub course_service: Arc<CourseService>,
    pub material_service: Arc<MaterialService>,
    pub activity_service: Arc<ActivityService>,
    pub stats_service: Arc<StatsService>,
    pub jwt_service: Arc<JwtService>,
    pub user_repository: Arc<dyn UserRepository>,
    pub storage: Arc<FileStorage>,
    pub db: Option<Database>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let repositories = Repositories::mongo(&db);
        repositories.ensure_indexes().await?;
        log::info!("MongoDB indexes ensured");

        Ok(Self::build(config, repositories, Some(db)))
    }

    /// Wires services over the given repositories. `db` is only used for readiness checks.
    pub fn build(config: Config, repositories: Repositories, db: Option<Database>) -> Self {
        let jwt_service = Arc::new(JwtService::new(
            &config.jwt_secret,
            config.jwt_access_expiry,
            config.jwt_refresh_expiry,
        ));
        let storage = Arc::new(FileStorage::new(config.upload_dir.clone()));

        let activity_service = Arc::new(ActivityService::new(repositories.activities.clone()));
        let auth_service = Arc::new(AuthService::new(
            repositories.users.clone(),
            repositories.refresh_tokens.clone(),
            activity_service.clone(),
            jwt_service.clone(),
            config.bcrypt_cost,
        ));
        let user_service = Arc::new(UserService::new(
            repositories.users.clone(),
            config.bcrypt_cost,
        ));
        let course_service = Arc::new(CourseService::new(
            repositories.courses.clone(),
            repositories.users.clone(),
        ));
        let material_service = Arc::new(MaterialService::new(
            repositories.materials.clone(),
            repositories.courses.clone(),
            repositories.users.clone(),
            activity_service.clone(),
            storage.clone(),
        ));
        let stats_service = Arc::new(StatsService::new(
            repositories.stats.clone(),
            repositories.activities.clone(),
            repositories.materials.clone(),
        ));

        Self {
            auth_service,
            user_service,
            course_service,
            material_service,
            activity_service,
            stats_service,
            jwt_service,
            user_repository: repositories.users,
            storage,
            db,
            config: Arc::new(config),
        }
    }

    pub async fn check_database(&self) -> AppResult<()> {
        match &self.db {
            Some(db) => db.health_check().await,
            None => Err(AppError::DatabaseError("Database not connected".to_string())),
        }
    }
}
