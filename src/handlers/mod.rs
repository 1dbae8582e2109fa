pub mod activity_handler;
pub mod auth_handler;
pub mod course_handler;
pub mod health_handler;
pub mod material_handler;
pub mod stats_handler;
pub mod user_handler;

use actix_web::{http::header, web, HttpRequest};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    errors::AppError, middleware::RateLimit, models::domain::ActivityMetadata,
};

/// Registers every route. `login_limit` guards `POST /api/auth/login` only.
pub fn configure(cfg: &mut web::ServiceConfig, login_limit: RateLimit) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .service(health_handler::health_check)
        .service(health_handler::health_check_live)
        .service(health_handler::health_check_ready)
        .service(
            web::resource("/api/auth/login")
                .wrap(login_limit)
                .route(web::post().to(auth_handler::login)),
        )
        .service(auth_handler::register)
        .service(auth_handler::refresh)
        .service(auth_handler::logout)
        .service(auth_handler::me)
        .service(auth_handler::change_password)
        .service(user_handler::list_users)
        .service(user_handler::get_user)
        .service(user_handler::create_user)
        .service(user_handler::update_user)
        .service(user_handler::delete_user)
        // `recommended` must be registered ahead of `{id}`.
        .service(course_handler::recommended_courses)
        .service(course_handler::list_courses)
        .service(course_handler::get_course)
        .service(course_handler::create_course)
        .service(course_handler::update_course)
        .service(course_handler::delete_course)
        .service(material_handler::list_materials)
        .service(material_handler::upload_material)
        .service(material_handler::check_duplicate)
        .service(material_handler::create_material)
        .service(material_handler::get_material)
        .service(material_handler::update_material)
        .service(material_handler::delete_material)
        .service(material_handler::download_material)
        .service(activity_handler::list_activities)
        .service(activity_handler::my_activities)
        .service(activity_handler::user_activities)
        .service(stats_handler::overview)
        .service(stats_handler::daily)
        .service(stats_handler::realtime)
        .service(stats_handler::campus)
        .service(stats_handler::materials)
        .service(stats_handler::users);
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::ValidationError(err.to_string()).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Client details attached to activity records.
pub fn request_metadata(req: &HttpRequest) -> ActivityMetadata {
    let user_agent = req
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ActivityMetadata {
        ip_address: req
            .connection_info()
            .realip_remote_addr()
            .map(str::to_string),
        device_type: user_agent.as_deref().map(device_type),
        browser: user_agent.as_deref().and_then(|ua| first_match(&BROWSERS, ua)),
        os: user_agent.as_deref().and_then(|ua| first_match(&OPERATING_SYSTEMS, ua)),
        user_agent,
        ..Default::default()
    }
}

/// Checked in order; Chromium-based browsers also advertise Chrome and Safari.
static BROWSERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    compile(&[
        ("Edge", r"Edg(e|A|iOS)?/"),
        ("Opera", r"OPR/|Opera"),
        ("Chrome", r"Chrome/|CriOS/"),
        ("Firefox", r"Firefox/|FxiOS/"),
        ("Safari", r"Version/[\d.]+.*Safari/"),
    ])
});

static OPERATING_SYSTEMS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    compile(&[
        ("Windows", r"Windows NT"),
        ("Android", r"Android"),
        ("iOS", r"iPhone|iPad|iPod"),
        ("macOS", r"Mac OS X|Macintosh"),
        ("Linux", r"Linux|X11"),
    ])
});

fn compile(patterns: &[(&'static str, &str)]) -> Vec<(&'static str, Regex)> {
    patterns
        .iter()
        .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (*name, re)))
        .collect()
}

fn first_match(table: &[(&'static str, Regex)], user_agent: &str) -> Option<String> {
    table
        .iter()
        .find(|(_, re)| re.is_match(user_agent))
        .map(|(name, _)| name.to_string())
}

fn device_type(user_agent: &str) -> String {
    let ua = user_agent.to_ascii_lowercase();
    if ua.contains("ipad") || ua.contains("tablet") {
        "tablet".to_string()
    } else if ua.contains("mobile") || ua.contains("android") || ua.contains("iphone") {
        "mobile".to_string()
    } else {
        "desktop".to_string()
    }
}
