//! Sample data for local development and demos.
//!
//! Generation is pure and driven by the caller's RNG; [`insert`] writes the
//! result to MongoDB.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use md5::{Digest, Md5};
use mongodb::bson::doc;
use rand::{seq::SliceRandom, Rng};

use crate::{
    db::Database,
    errors::{AppError, AppResult},
    models::domain::{
        ActionType, Activity, ActivityMetadata, Campus, Course, FileInfo, Material, MaterialType,
        Rating, TargetType, User, UserRole, UserStatus, Visibility,
    },
};

pub const ADMIN_EMAIL: &str = "admin@hnue.edu.vn";
pub const ADMIN_PASSWORD: &str = "Admin@123";
pub const LECTURER_PASSWORD: &str = "Lecturer@123";
pub const STUDENT_PASSWORD: &str = "Student@123";

pub const MATERIAL_COUNT: usize = 300;
pub const ACTIVITY_COUNT: usize = 500;

/// Users per campus, the admin included.
const USERS_PER_CAMPUS: [(Campus, usize); 3] =
    [(Campus::Hanoi, 100), (Campus::Danang, 50), (Campus::Hcm, 50)];
const COURSES_PER_CAMPUS: [(Campus, usize); 3] =
    [(Campus::Hanoi, 25), (Campus::Danang, 15), (Campus::Hcm, 10)];

/// Department name, course code prefix, course titles.
const DEPARTMENTS: [(&str, &str, [&str; 5]); 10] = [
    (
        "Information Technology",
        "IT",
        ["Introduction to Programming", "Data Structures", "Databases", "Computer Networks", "Artificial Intelligence"],
    ),
    (
        "Mathematics",
        "MATH",
        ["Calculus 1", "Linear Algebra", "Probability and Statistics", "Discrete Mathematics", "Differential Equations"],
    ),
    (
        "Physics",
        "PHY",
        ["Mechanics", "Electromagnetism", "Optics", "Modern Physics", "Thermodynamics"],
    ),
    (
        "Chemistry",
        "CHEM",
        ["General Chemistry", "Organic Chemistry", "Inorganic Chemistry", "Analytical Chemistry", "Physical Chemistry"],
    ),
    (
        "Biology",
        "BIO",
        ["General Biology", "Genetics", "Ecology", "Microbiology", "Molecular Biology"],
    ),
    (
        "Literature",
        "LIT",
        ["Vietnamese Literature", "World Literature", "Linguistics", "Literary Theory", "Research Methods in Literature"],
    ),
    (
        "History",
        "HIS",
        ["History of Vietnam", "World History", "Archaeology", "Historical Methods", "Cultural History"],
    ),
    (
        "Geography",
        "GEO",
        ["Physical Geography", "Economic Geography", "Human Geography", "Cartography", "GIS and Remote Sensing"],
    ),
    (
        "English",
        "ENG",
        ["English Grammar", "Listening Skills", "Speaking Skills", "Writing Skills", "Translation"],
    ),
    (
        "Education",
        "EDU",
        ["Educational Psychology", "Teaching Methods", "Assessment in Education", "Education Management", "Educational Technology"],
    ),
];

const FAMILY_NAMES: [&str; 10] = [
    "Nguyen", "Tran", "Le", "Pham", "Hoang", "Huynh", "Phan", "Vu", "Vo", "Dang",
];
const MIDDLE_NAMES: [&str; 10] = [
    "Van", "Thi", "Huu", "Minh", "Hoang", "Thanh", "Quoc", "Ngoc", "Duc", "Tuan",
];
const GIVEN_NAMES: [&str; 10] = [
    "Anh", "Binh", "Cuong", "Dung", "Hai", "Hung", "Khoa", "Long", "Nam", "Phong",
];

const SEMESTERS: [&str; 3] = ["2024-1", "2024-2", "2025-1"];
const BROWSERS: [&str; 5] = ["Chrome", "Firefox", "Safari", "Edge", "Opera"];
const DEVICES: [&str; 3] = ["desktop", "mobile", "tablet"];
const OSES: [&str; 6] = ["Windows 10", "Windows 11", "macOS", "Linux", "iOS", "Android"];
const SEARCH_TERMS: [&str; 5] = ["python", "java", "database", "algorithm", "network"];

/// Already-hashed passwords, one per role.
#[derive(Debug, Clone)]
pub struct SeedPasswords {
    pub admin: String,
    pub lecturer: String,
    pub student: String,
}

#[derive(Debug, Clone)]
pub struct SeedData {
    pub users: Vec<User>,
    pub courses: Vec<Course>,
    pub materials: Vec<Material>,
    pub activities: Vec<Activity>,
}

impl SeedData {
    pub fn total(&self) -> usize {
        self.users.len() + self.courses.len() + self.materials.len() + self.activities.len()
    }
}

pub fn generate<R: Rng>(passwords: &SeedPasswords, rng: &mut R) -> SeedData {
    let users = generate_users(passwords, rng);
    let courses = generate_courses(&users, rng);
    let materials = generate_materials(&courses, rng);
    let activities = generate_activities(&users, &materials, rng);

    SeedData {
        users,
        courses,
        materials,
        activities,
    }
}

fn generate_users<R: Rng>(passwords: &SeedPasswords, rng: &mut R) -> Vec<User> {
    let mut users = vec![User::new(
        ADMIN_EMAIL,
        passwords.admin.clone(),
        "System Administrator",
        UserRole::Admin,
        Campus::Hanoi,
        DEPARTMENTS[0].0,
    )];

    let mut index = 1;
    for (campus, total) in USERS_PER_CAMPUS {
        let count = if campus == Campus::Hanoi { total - 1 } else { total };
        let lecturers = count / 5;

        for n in 0..count {
            let department = pick(&DEPARTMENTS, rng).0;
            let user = if n < lecturers {
                User::new(
                    &format!("lecturer{}@hnue.edu.vn", index),
                    passwords.lecturer.clone(),
                    &format!("Dr. {}", person_name(rng)),
                    UserRole::Lecturer,
                    campus,
                    department,
                )
            } else {
                let mut student = User::new(
                    &format!("student{}@hnue.edu.vn", index),
                    passwords.student.clone(),
                    &person_name(rng),
                    UserRole::Student,
                    campus,
                    department,
                );
                if rng.gen_bool(0.05) {
                    student.status = UserStatus::Inactive;
                }
                student
            };
            users.push(user);
            index += 1;
        }
    }

    users
}

fn generate_courses<R: Rng>(users: &[User], rng: &mut R) -> Vec<Course> {
    let staff: Vec<&User> = users
        .iter()
        .filter(|u| matches!(u.role, UserRole::Lecturer | UserRole::Admin))
        .collect();

    let mut courses = Vec::new();
    let mut code_number = 100;

    for (campus, count) in COURSES_PER_CAMPUS {
        let campus_staff: Vec<&User> = staff.iter().copied().filter(|u| u.campus == campus).collect();

        for _ in 0..count {
            let (department, prefix, titles) = pick(&DEPARTMENTS, rng);
            let title = pick(titles, rng);

            let department_staff: Vec<&User> = campus_staff
                .iter()
                .copied()
                .filter(|u| u.department == *department)
                .collect();
            let instructor = [&department_staff, &campus_staff, &staff]
                .into_iter()
                .find_map(|pool| pool.choose(rng))
                .copied();
            let (instructor_id, instructor_name) = instructor
                .map(|u| (u.user_id.as_str(), u.full_name.as_str()))
                .unwrap_or(("", "Unknown"));

            let mut course = Course::new(
                &format!("{}{}", prefix, code_number),
                title,
                campus,
                department,
                instructor_id,
                instructor_name,
                rng.gen_range(2..=4),
            );
            code_number += 1;

            course.description = format!(
                "{} in the {} department. Covers fundamentals through advanced topics.",
                title, department
            );
            course.semester = pick(&SEMESTERS, rng).to_string();
            course.enrollment_count = rng.gen_range(20..=60);
            course.tags = vec![
                prefix.to_lowercase(),
                slug(department),
                "semester-2024".to_string(),
            ];
            courses.push(course);
        }
    }

    courses
}

fn generate_materials<R: Rng>(courses: &[Course], rng: &mut R) -> Vec<Material> {
    let mut materials = Vec::with_capacity(MATERIAL_COUNT);
    let mut checksums = HashSet::new();

    'courses: for course in courses {
        for chapter in 1..=rng.gen_range(4..=8) {
            if materials.len() >= MATERIAL_COUNT {
                break 'courses;
            }
            materials.push(material_for(course, &format!("Chapter {}", chapter), &mut checksums, rng));
        }
    }

    while materials.len() < MATERIAL_COUNT {
        let Some(course) = courses.choose(rng) else {
            break;
        };
        materials.push(material_for(course, "Supplementary", &mut checksums, rng));
    }

    materials
}

fn material_for<R: Rng>(
    course: &Course,
    label: &str,
    checksums: &mut HashSet<String>,
    rng: &mut R,
) -> Material {
    let material_type = *pick(MaterialType::ALL, rng);
    let (mime_type, extension) = file_kind(material_type);

    let checksum_md5 = loop {
        let seed = format!("{}-{}-{}", course.course_id, label, rng.gen::<u64>());
        let checksum = format!("{:x}", Md5::digest(seed.as_bytes()));
        if checksums.insert(checksum.clone()) {
            break checksum;
        }
    };

    let size_bytes = if material_type == MaterialType::Video {
        rng.gen_range(50_000_000..=200_000_000)
    } else {
        rng.gen_range(100_000..=10_000_000)
    };
    let filename = format!("{}{}", checksum_md5, extension);

    let file_info = FileInfo {
        original_name: format!(
            "{}_{}_{}{}",
            course.course_code,
            label.replace(' ', ""),
            material_type,
            extension
        ),
        storage_path: format!("materials/seed/{}", filename),
        filename,
        mime_type: mime_type.to_string(),
        size_bytes,
        checksum_md5,
    };

    let mut material = Material::for_course(
        course,
        &format!("{} {}: {}", material_type, label, course.title),
        material_type,
        file_info,
        &course.instructor_id,
        &course.instructor_name,
    );
    material.description = format!(
        "{} material for {}, covering {}.",
        label, course.course_code, course.title
    );
    material.visibility = *pick(
        &[Visibility::Public, Visibility::Course, Visibility::Course, Visibility::Private],
        rng,
    );
    material.download_count = rng.gen_range(10..=200);
    material.view_count = rng.gen_range(50..=500);
    material.rating = Rating {
        average: f64::from(rng.gen_range(35..=50_i32)) / 10.0,
        count: rng.gen_range(5..=50),
    };
    material.tags = vec![
        material_type.to_string(),
        course.course_code.to_lowercase(),
        slug(&course.department),
    ];
    material
}

fn generate_activities<R: Rng>(users: &[User], materials: &[Material], rng: &mut R) -> Vec<Activity> {
    let now = Utc::now();
    let window_secs = 30 * 24 * 60 * 60;

    let mut activities: Vec<Activity> = (0..ACTIVITY_COUNT)
        .filter_map(|_| {
            let user = users.choose(rng)?;
            let material = materials.choose(rng)?;
            let action = weighted_action(rng);
            let timestamp = now - Duration::seconds(rng.gen_range(0..window_secs));

            let mut metadata = ActivityMetadata {
                ip_address: Some(format!(
                    "192.168.{}.{}",
                    rng.gen_range(1..=255),
                    rng.gen_range(1..=255)
                )),
                user_agent: Some(format!(
                    "Mozilla/5.0 ({}) {}/{}.0",
                    pick(&OSES, rng),
                    pick(&BROWSERS, rng),
                    rng.gen_range(80..=120)
                )),
                device_type: Some(pick(&DEVICES, rng).to_string()),
                browser: Some(pick(&BROWSERS, rng).to_string()),
                os: Some(pick(&OSES, rng).to_string()),
                session_id: Some(format!("sess_{:016x}", rng.gen::<u64>())),
                ..Default::default()
            };
            match action {
                ActionType::View => metadata.duration_seconds = Some(rng.gen_range(30..=1800)),
                ActionType::Download => metadata.file_size_bytes = Some(material.file_info.size_bytes),
                ActionType::Search => {
                    metadata.search_query = Some(if rng.gen_bool(0.2) {
                        material.course_code.clone()
                    } else {
                        pick(&SEARCH_TERMS, rng).to_string()
                    })
                }
                _ => {}
            }

            Some(
                Activity::at(
                    timestamp,
                    &user.user_id,
                    &user.full_name,
                    user.campus,
                    action,
                    TargetType::Material,
                    &material.material_id,
                    &material.title,
                )
                .with_metadata(metadata),
            )
        })
        .collect();

    activities.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    activities
}

/// view 40%, download 30%, login 15%, search 10%, upload 5%.
fn weighted_action<R: Rng>(rng: &mut R) -> ActionType {
    match rng.gen_range(0..100) {
        0..=39 => ActionType::View,
        40..=69 => ActionType::Download,
        70..=84 => ActionType::Login,
        85..=94 => ActionType::Search,
        _ => ActionType::Upload,
    }
}

fn file_kind(material_type: MaterialType) -> (&'static str, &'static str) {
    match material_type {
        MaterialType::Slide => (
            "application/vnd.openxmlformats-officedocument.presentationml.presentation",
            ".pptx",
        ),
        MaterialType::Video => ("video/mp4", ".mp4"),
        MaterialType::Document => ("application/pdf", ".pdf"),
        MaterialType::Quiz => ("application/json", ".json"),
        MaterialType::Assignment => (
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ".docx",
        ),
    }
}

fn person_name<R: Rng>(rng: &mut R) -> String {
    format!(
        "{} {} {}",
        pick(&FAMILY_NAMES, rng),
        pick(&MIDDLE_NAMES, rng),
        pick(&GIVEN_NAMES, rng)
    )
}

fn slug(value: &str) -> String {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Every caller passes a non-empty constant table.
fn pick<'a, T, R: Rng>(items: &'a [T], rng: &mut R) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

/// Writes the generated records. With `reset`, the collections are emptied first.
pub async fn insert(db: &Database, data: &SeedData, reset: bool) -> AppResult<()> {
    let users = db.get_collection::<User>("users");
    let courses = db.get_collection::<Course>("courses");
    let materials = db.get_collection::<Material>("materials");
    let activities = db.get_collection::<Activity>("activities");

    if reset {
        users.delete_many(doc! {}).await?;
        courses.delete_many(doc! {}).await?;
        materials.delete_many(doc! {}).await?;
        activities.delete_many(doc! {}).await?;
        db.get_collection::<mongodb::bson::Document>("refresh_tokens")
            .delete_many(doc! {})
            .await?;
        log::info!("Cleared users, courses, materials, activities and refresh tokens");
    } else if users.count_documents(doc! { "email": ADMIN_EMAIL }).await? > 0 {
        return Err(AppError::AlreadyExists(
            "Seed data already present; rerun with --reset".to_string(),
        ));
    }

    users.insert_many(&data.users).await?;
    courses.insert_many(&data.courses).await?;
    materials.insert_many(&data.materials).await?;
    activities.insert_many(&data.activities).await?;

    log::info!(
        "Seeded {} users, {} courses, {} materials, {} activities",
        data.users.len(),
        data.courses.len(),
        data.materials.len(),
        data.activities.len()
    );
    Ok(())
}
