#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use mongodb::bson::{from_document, to_document, DateTime, Document};
use secrecy::SecretString;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;

use smartlearn_server::{
    app_state::{AppState, Repositories},
    config::Config,
    errors::{AppError, AppResult},
    models::{
        domain::{
            ActionType, Activity, Campus, Course, CourseStatus, Material, RefreshToken, User,
            UserStatus,
        },
        dto::{
            request::{ActivityListQuery, CourseListQuery, MaterialListQuery, Pagination, UserListQuery},
            stats::{
                CampusStats, CountBucket, DailyActionRow, DailyKey, DepartmentBreakdown,
                HourlyStat, MaterialStats, OverviewStats, TopMaterial, TypeBreakdown, UserStats,
            },
        },
    },
    repositories::{
        ActivityRepository, CourseRepository, MaterialRepository, RefreshTokenRepository,
        StatsRepository, UserRepository,
    },
};

pub fn test_config(upload_dir: &Path) -> Config {
    Config {
        app_env: "test".to_string(),
        mongo_conn_string: "mongodb://localhost:27017".to_string(),
        mongo_db_name: "smartlearn-test".to_string(),
        web_server_host: "127.0.0.1".to_string(),
        web_server_port: 3001,
        jwt_secret: SecretString::from("integration_test_secret_key_0123456789".to_string()),
        jwt_access_expiry: Duration::from_secs(15 * 60),
        jwt_refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
        bcrypt_cost: 4,
        upload_dir: upload_dir.to_path_buf(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        rate_limit_window: Duration::from_secs(60),
        rate_limit_max: 1000,
        login_limit_window: Duration::from_secs(60),
        login_limit_max: 5,
    }
}

/// A fresh, empty scratch directory for uploads.
pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "smartlearn-{}-{}",
        name,
        uuid::Uuid::new_v4()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Mirrors a Mongo `$set`: named fields change, the rest stay as stored.
fn apply_set<T: Serialize + DeserializeOwned>(item: &T, changes: Document) -> AppResult<T> {
    let mut document = to_document(item)?;
    for (key, value) in changes {
        document.insert(key, value);
    }
    document.insert("updated_at", DateTime::now());
    Ok(from_document(document)?)
}

fn paginate<T: Clone>(items: Vec<T>, pagination: Pagination) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.limit as usize)
        .collect();
    (page, total)
}

fn matches_search(search: Option<&str>, fields: &[&str]) -> bool {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(term) => {
            let term = term.to_lowercase();
            fields.iter().any(|f| f.to_lowercase().contains(&term))
        }
        None => true,
    }
}

// ---- users ----

#[derive(Default)]
pub struct InMemoryUserRepository {
    pub users: RwLock<HashMap<String, User>>,
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, user: User) -> AppResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::AlreadyExists("Email already exists".to_string()));
        }
        users.insert(user.user_id.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<User>> {
        Ok(self.users.read().await.get(user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn list(
        &self,
        query: &UserListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<User>, i64)> {
        let users = self.users.read().await;
        let mut items: Vec<User> = users
            .values()
            .filter(|u| query.campus.map_or(true, |c| u.campus == c))
            .filter(|u| query.role.map_or(true, |r| u.role == r))
            .filter(|u| query.status.map_or(true, |s| u.status == s))
            .filter(|u| {
                query
                    .department
                    .as_deref()
                    .map_or(true, |d| d.is_empty() || u.department == d)
            })
            .filter(|u| matches_search(query.search.as_deref(), &[&u.full_name, &u.email]))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, pagination))
    }

    async fn update(&self, user_id: &str, changes: Document) -> AppResult<User> {
        let mut users = self.users.write().await;
        let existing = users
            .get_mut(user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        *existing = apply_set(existing, changes)?;
        Ok(existing.clone())
    }

    async fn set_last_login(&self, user_id: &str, at: DateTime) -> AppResult<()> {
        if let Some(user) = self.users.write().await.get_mut(user_id) {
            user.last_login = Some(at);
        }
        Ok(())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

// ---- courses ----

#[derive(Default)]
pub struct InMemoryCourseRepository {
    pub courses: RwLock<HashMap<String, Course>>,
}

#[async_trait]
impl CourseRepository for InMemoryCourseRepository {
    async fn create(&self, course: Course) -> AppResult<Course> {
        let mut courses = self.courses.write().await;
        if courses.values().any(|c| c.course_code == course.course_code) {
            return Err(AppError::AlreadyExists(
                "Course code already exists".to_string(),
            ));
        }
        courses.insert(course.course_id.clone(), course.clone());
        Ok(course)
    }

    async fn find_by_course_id(&self, course_id: &str) -> AppResult<Option<Course>> {
        Ok(self.courses.read().await.get(course_id).cloned())
    }

    async fn find_by_code(&self, course_code: &str) -> AppResult<Option<Course>> {
        let courses = self.courses.read().await;
        Ok(courses.values().find(|c| c.course_code == course_code).cloned())
    }

    async fn list(
        &self,
        query: &CourseListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Course>, i64)> {
        let courses = self.courses.read().await;
        let mut items: Vec<Course> = courses
            .values()
            .filter(|c| c.status == CourseStatus::Active)
            .filter(|c| query.campus.map_or(true, |campus| c.campus == campus))
            .filter(|c| {
                query
                    .department
                    .as_deref()
                    .map_or(true, |d| d.is_empty() || c.department == d)
            })
            .filter(|c| {
                query
                    .instructor_id
                    .as_deref()
                    .map_or(true, |i| i.is_empty() || c.instructor_id == i)
            })
            .filter(|c| matches_search(query.search.as_deref(), &[&c.title, &c.course_code]))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, pagination))
    }

    async fn recommended(
        &self,
        campus: Campus,
        exclude_instructor: Option<String>,
        limit: i64,
    ) -> AppResult<Vec<Course>> {
        let courses = self.courses.read().await;
        let mut items: Vec<Course> = courses
            .values()
            .filter(|c| c.status == CourseStatus::Active && c.campus == campus)
            .filter(|c| exclude_instructor.as_deref() != Some(c.instructor_id.as_str()))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.enrollment_count
                .cmp(&a.enrollment_count)
                .then(b.created_at.cmp(&a.created_at))
        });
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn update(&self, course_id: &str, changes: Document) -> AppResult<Course> {
        let mut courses = self.courses.write().await;
        let existing = courses
            .get_mut(course_id)
            .ok_or_else(|| AppError::NotFound("Course not found".to_string()))?;
        *existing = apply_set(existing, changes)?;
        Ok(existing.clone())
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

// ---- materials ----

#[derive(Default)]
pub struct InMemoryMaterialRepository {
    pub materials: RwLock<HashMap<String, Material>>,
}

#[async_trait]
impl MaterialRepository for InMemoryMaterialRepository {
    async fn create(&self, material: Material) -> AppResult<Material> {
        self.materials
            .write()
            .await
            .insert(material.material_id.clone(), material.clone());
        Ok(material)
    }

    async fn find_by_material_id(&self, material_id: &str) -> AppResult<Option<Material>> {
        let materials = self.materials.read().await;
        Ok(materials
            .get(material_id)
            .filter(|m| !m.is_deleted)
            .cloned())
    }

    async fn find_by_checksum(&self, checksum: &str) -> AppResult<Option<Material>> {
        let materials = self.materials.read().await;
        Ok(materials
            .values()
            .find(|m| !m.is_deleted && m.file_info.checksum_md5 == checksum)
            .cloned())
    }

    async fn list(
        &self,
        query: &MaterialListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Material>, i64)> {
        let materials = self.materials.read().await;
        let mut items: Vec<Material> = materials
            .values()
            .filter(|m| !m.is_deleted)
            .filter(|m| query.campus.map_or(true, |c| m.campus == c))
            .filter(|m| query.material_type.map_or(true, |t| m.material_type == t))
            .filter(|m| {
                query
                    .department
                    .as_deref()
                    .map_or(true, |d| d.is_empty() || m.department == d)
            })
            .filter(|m| {
                query
                    .course_id
                    .as_deref()
                    .map_or(true, |c| c.is_empty() || m.course_id == c)
            })
            .filter(|m| matches_search(query.search.as_deref(), &[&m.title, &m.description]))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, pagination))
    }

    async fn increment_views(&self, material_id: &str) -> AppResult<()> {
        if let Some(m) = self.materials.write().await.get_mut(material_id) {
            m.view_count += 1;
        }
        Ok(())
    }

    async fn increment_downloads(&self, material_id: &str) -> AppResult<()> {
        if let Some(m) = self.materials.write().await.get_mut(material_id) {
            m.download_count += 1;
        }
        Ok(())
    }

    async fn update(&self, material_id: &str, changes: Document) -> AppResult<Material> {
        let mut materials = self.materials.write().await;
        let existing = materials
            .get_mut(material_id)
            .ok_or_else(|| AppError::NotFound("Material not found".to_string()))?;
        *existing = apply_set(existing, changes)?;
        Ok(existing.clone())
    }

    async fn top_by_engagement(&self, limit: i64) -> AppResult<Vec<Material>> {
        let materials = self.materials.read().await;
        let mut items: Vec<Material> = materials.values().filter(|m| !m.is_deleted).cloned().collect();
        items.sort_by(|a, b| b.engagement().total_cmp(&a.engagement()));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

// ---- activities ----

#[derive(Default)]
pub struct InMemoryActivityRepository {
    pub activities: RwLock<Vec<Activity>>,
}

impl InMemoryActivityRepository {
    async fn newest_first(&self, keep: impl Fn(&Activity) -> bool) -> Vec<Activity> {
        let activities = self.activities.read().await;
        let mut items: Vec<Activity> = activities.iter().filter(|a| keep(a)).cloned().collect();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        items
    }
}

#[async_trait]
impl ActivityRepository for InMemoryActivityRepository {
    async fn create(&self, activity: Activity) -> AppResult<Activity> {
        self.activities.write().await.push(activity.clone());
        Ok(activity)
    }

    async fn list(
        &self,
        query: &ActivityListQuery,
        pagination: Pagination,
    ) -> AppResult<(Vec<Activity>, i64)> {
        let items = self
            .newest_first(|a| {
                query.campus.map_or(true, |c| a.campus == c)
                    && query.action.map_or(true, |act| a.action == act)
                    && query.user_id.as_deref().map_or(true, |u| a.user_id == u)
                    && query.date.as_deref().map_or(true, |d| a.date == d)
            })
            .await;
        Ok(paginate(items, pagination))
    }

    async fn find_by_user(
        &self,
        user_id: &str,
        pagination: Pagination,
    ) -> AppResult<(Vec<Activity>, i64)> {
        let items = self.newest_first(|a| a.user_id == user_id).await;
        Ok(paginate(items, pagination))
    }

    async fn recent(&self, since: DateTime, limit: i64) -> AppResult<Vec<Activity>> {
        let mut items = self.newest_first(|a| a.timestamp >= since).await;
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

// ---- refresh tokens ----

#[derive(Default)]
pub struct InMemoryRefreshTokenRepository {
    pub tokens: RwLock<HashMap<String, RefreshToken>>,
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    async fn create(&self, token: RefreshToken) -> AppResult<RefreshToken> {
        self.tokens
            .write()
            .await
            .insert(token.token_hash.clone(), token.clone());
        Ok(token)
    }

    async fn find_by_token_hash(&self, hash: &str) -> AppResult<Option<RefreshToken>> {
        Ok(self.tokens.read().await.get(hash).cloned())
    }

    async fn delete_by_token_hash(&self, hash: &str) -> AppResult<bool> {
        Ok(self.tokens.write().await.remove(hash).is_some())
    }

    async fn delete_all_for_user(&self, user_id: &str) -> AppResult<u64> {
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - tokens.len()) as u64)
    }

    async fn ensure_indexes(&self) -> AppResult<()> {
        Ok(())
    }
}

// ---- stats ----

/// Computes the aggregates directly over the other in-memory stores.
pub struct InMemoryStatsRepository {
    pub users: Arc<InMemoryUserRepository>,
    pub courses: Arc<InMemoryCourseRepository>,
    pub materials: Arc<InMemoryMaterialRepository>,
    pub activities: Arc<InMemoryActivityRepository>,
}

fn buckets<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<CountBucket> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for key in keys {
        *counts.entry(key.to_string()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(id, count)| CountBucket { id, count })
        .collect()
}

#[async_trait]
impl StatsRepository for InMemoryStatsRepository {
    async fn overview(&self) -> AppResult<OverviewStats> {
        let users = self.users.users.read().await;
        let courses = self.courses.courses.read().await;
        let materials = self.materials.materials.read().await;

        let active_users: Vec<&User> = users.values().filter(|u| u.is_active()).collect();
        let live: Vec<&Material> = materials.values().filter(|m| !m.is_deleted).collect();

        Ok(OverviewStats {
            total_users: active_users.len() as i64,
            total_courses: courses.values().filter(|c| c.is_active()).count() as i64,
            total_materials: live.len() as i64,
            total_downloads: live.iter().map(|m| m.download_count).sum(),
            total_views: live.iter().map(|m| m.view_count).sum(),
            users_by_campus: buckets(active_users.iter().map(|u| u.campus.as_str())),
            materials_by_type: buckets(live.iter().map(|m| m.material_type.as_str())),
        })
    }

    async fn daily_rows(&self, since: DateTime) -> AppResult<Vec<DailyActionRow>> {
        let activities = self.activities.activities.read().await;
        let mut groups: BTreeMap<(String, &'static str), (ActionType, i64, HashSet<String>)> =
            BTreeMap::new();

        for a in activities.iter().filter(|a| a.timestamp >= since).filter(|a| {
            matches!(a.action, ActionType::View | ActionType::Download | ActionType::Upload)
        }) {
            let entry = groups
                .entry((a.date.clone(), a.action.as_str()))
                .or_insert_with(|| (a.action, 0, HashSet::new()));
            entry.1 += 1;
            entry.2.insert(a.user_id.clone());
        }

        Ok(groups
            .into_iter()
            .map(|((date, _), (action, count, users))| DailyActionRow {
                key: DailyKey { date, action },
                count,
                users: users.into_iter().collect(),
            })
            .collect())
    }

    async fn hourly_counts(&self, since: DateTime) -> AppResult<Vec<HourlyStat>> {
        let activities = self.activities.activities.read().await;
        let mut hours: BTreeMap<i32, i64> = BTreeMap::new();
        for a in activities.iter().filter(|a| a.timestamp >= since) {
            *hours.entry(a.hour).or_default() += 1;
        }
        Ok(hours
            .into_iter()
            .map(|(hour, count)| HourlyStat { hour, count })
            .collect())
    }

    async fn campus(&self, campus: Campus) -> AppResult<CampusStats> {
        let users = self.users.users.read().await;
        let courses = self.courses.courses.read().await;
        let materials = self.materials.materials.read().await;
        let activities = self.activities.activities.read().await;

        Ok(CampusStats {
            campus,
            users: users.values().filter(|u| u.campus == campus && u.is_active()).count() as i64,
            courses: courses.values().filter(|c| c.campus == campus && c.is_active()).count() as i64,
            materials: materials
                .values()
                .filter(|m| m.campus == campus && !m.is_deleted)
                .count() as i64,
            activities: buckets(
                activities
                    .iter()
                    .filter(|a| a.campus == campus)
                    .map(|a| a.action.as_str()),
            ),
        })
    }

    async fn materials(&self) -> AppResult<MaterialStats> {
        let materials = self.materials.materials.read().await;
        let live: Vec<&Material> = materials.values().filter(|m| !m.is_deleted).collect();

        let by_type = buckets(live.iter().map(|m| m.material_type.as_str()))
            .into_iter()
            .map(|bucket| {
                let of_type = live.iter().filter(|m| m.material_type.as_str() == bucket.id);
                TypeBreakdown {
                    total_downloads: of_type.clone().map(|m| m.download_count).sum(),
                    total_views: of_type.map(|m| m.view_count).sum(),
                    id: bucket.id,
                    count: bucket.count,
                }
            })
            .collect();
        let by_department = buckets(live.iter().map(|m| m.department.as_str()))
            .into_iter()
            .map(|bucket| DepartmentBreakdown {
                total_downloads: live
                    .iter()
                    .filter(|m| m.department == bucket.id)
                    .map(|m| m.download_count)
                    .sum(),
                id: bucket.id,
                count: bucket.count,
            })
            .collect();

        let top = |key: fn(&Material) -> i64, downloads: bool| {
            let mut sorted = live.clone();
            sorted.sort_by_key(|m| std::cmp::Reverse(key(m)));
            sorted
                .into_iter()
                .take(10)
                .map(|m| TopMaterial {
                    material_id: m.material_id.clone(),
                    title: m.title.clone(),
                    course_code: m.course_code.clone(),
                    download_count: downloads.then_some(m.download_count),
                    view_count: (!downloads).then_some(m.view_count),
                })
                .collect()
        };

        Ok(MaterialStats {
            by_type,
            by_department,
            top_downloaded: top(|m| m.download_count, true),
            top_viewed: top(|m| m.view_count, false),
        })
    }

    async fn users(&self, new_since: DateTime) -> AppResult<UserStats> {
        let users = self.users.users.read().await;
        let active: Vec<&User> = users.values().filter(|u| u.is_active()).collect();

        Ok(UserStats {
            by_role: buckets(active.iter().map(|u| u.role.as_str())),
            by_campus: buckets(active.iter().map(|u| u.campus.as_str())),
            by_status: buckets(users.values().map(|u| u.status.as_str())),
            new_users_last_30_days: users.values().filter(|u| u.created_at >= new_since).count()
                as i64,
        })
    }
}

/// Concrete handles kept alongside the trait objects so tests can inspect state.
pub struct Stores {
    pub users: Arc<InMemoryUserRepository>,
    pub courses: Arc<InMemoryCourseRepository>,
    pub materials: Arc<InMemoryMaterialRepository>,
    pub activities: Arc<InMemoryActivityRepository>,
    pub refresh_tokens: Arc<InMemoryRefreshTokenRepository>,
}

impl Stores {
    pub fn new() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::default()),
            courses: Arc::new(InMemoryCourseRepository::default()),
            materials: Arc::new(InMemoryMaterialRepository::default()),
            activities: Arc::new(InMemoryActivityRepository::default()),
            refresh_tokens: Arc::new(InMemoryRefreshTokenRepository::default()),
        }
    }

    pub fn repositories(&self) -> Repositories {
        Repositories {
            users: self.users.clone(),
            courses: self.courses.clone(),
            materials: self.materials.clone(),
            activities: self.activities.clone(),
            refresh_tokens: self.refresh_tokens.clone(),
            stats: Arc::new(InMemoryStatsRepository {
                users: self.users.clone(),
                courses: self.courses.clone(),
                materials: self.materials.clone(),
                activities: self.activities.clone(),
            }),
        }
    }

    /// Inserts an active user whose password is `password`.
    pub async fn add_user(
        &self,
        email: &str,
        password: &str,
        role: smartlearn_server::models::domain::UserRole,
        campus: Campus,
    ) -> User {
        let hash = smartlearn_server::auth::hash_password(password, 4).await.unwrap();
        let user = User::new(email, hash, "Test Person", role, campus, "Information Technology");
        self.users.create(user).await.unwrap()
    }

    pub async fn set_status(&self, user_id: &str, status: UserStatus) {
        if let Some(user) = self.users.users.write().await.get_mut(user_id) {
            user.status = status;
        }
    }
}

pub fn app_state(stores: &Stores, upload_dir: &Path) -> Arc<AppState> {
    Arc::new(AppState::build(
        test_config(upload_dir),
        stores.repositories(),
        None,
    ))
}
