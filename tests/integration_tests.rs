mod common;

use std::{path::Path, time::Duration};

use actix_web::{http::StatusCode, test, web, App};
use serde_json::{json, Value};

use smartlearn_server::{auth::AuthMiddleware, handlers, middleware::RateLimit};

use common::{app_state, scratch_dir, Stores};

const BOUNDARY: &str = "----smartlearn-test-boundary";

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .wrap(AuthMiddleware::new(
                    $state.jwt_service.clone(),
                    $state.user_repository.clone(),
                ))
                .configure(|cfg| {
                    handlers::configure(cfg, RateLimit::failed_logins(Duration::from_secs(60), 5))
                }),
        )
        .await
    };
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

fn register_body(email: &str, role: &str) -> Value {
    json!({
        "email": email,
        "password": "Secret@123",
        "full_name": "Tran Thi B",
        "campus": "hanoi",
        "department": "Mathematics",
        "role": role,
    })
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, mime, content)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime).as_bytes());
        body.extend_from_slice(content);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn upload_request(token: &str, body: Vec<u8>) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/materials/upload")
        .insert_header(bearer(token))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ))
        .set_payload(body)
}

fn count_files(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_files(&path)
            } else {
                1
            }
        })
        .sum()
}

#[actix_web::test]
async fn test_health_endpoints() {
    let stores = Stores::new();
    let state = app_state(&stores, &scratch_dir("http-health"));
    let app = init_app!(state);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");

    // No database behind the in-memory repositories.
    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request()).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[actix_web::test]
async fn test_register_and_me() {
    let stores = Stores::new();
    let state = app_state(&stores, &scratch_dir("http-me"));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("me@hnue.edu.vn", "student"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();
    assert!(body["data"]["user"].get("password_hash").is_none());

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["email"], "me@hnue.edu.vn");
    assert_eq!(body["data"]["role"], "student");

    let req = test::TestRequest::get().uri("/api/auth/me").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer("garbage"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], 401);
}

#[actix_web::test]
async fn test_register_validation_errors() {
    let stores = Stores::new();
    let state = app_state(&stores, &scratch_dir("http-validation"));
    let app = init_app!(state);

    let mut body = register_body("short@hnue.edu.vn", "student");
    body["password"] = json!("abc");
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut body = register_body("campus@hnue.edu.vn", "student");
    body["campus"] = json!("saigon");
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_failed_logins_are_limited() {
    let stores = Stores::new();
    let state = app_state(&stores, &scratch_dir("http-login-limit"));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("limited@hnue.edu.vn", "student"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

    for _ in 0..5 {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({ "email": "limited@hnue.edu.vn", "password": "wrong" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "limited@hnue.edu.vn", "password": "Secret@123" }))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[actix_web::test]
async fn test_students_cannot_manage_courses() {
    let stores = Stores::new();
    let state = app_state(&stores, &scratch_dir("http-roles"));
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("pupil@hnue.edu.vn", "student"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/courses")
        .insert_header(bearer(&token))
        .set_json(json!({
            "course_code": "MA101",
            "title": "Calculus",
            "campus": "hanoi",
            "department": "Mathematics",
            "credits": 3,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri("/api/stats/overview")
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_upload_dedup_and_download() {
    let stores = Stores::new();
    let upload_dir = scratch_dir("http-upload");
    let state = app_state(&stores, &upload_dir);
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(register_body("lecturer7@hnue.edu.vn", "lecturer"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/courses")
        .insert_header(bearer(&token))
        .set_json(json!({
            "course_code": "ma201",
            "title": "Linear Algebra",
            "campus": "hanoi",
            "department": "Mathematics",
            "credits": 4,
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["course_code"], "MA201");
    let course_id = body["data"]["course_id"].as_str().unwrap().to_string();

    let content: &[u8] = b"%PDF-1.4 linear algebra notes";
    let fields = [
        ("title", "Vectors"),
        ("course_id", course_id.as_str()),
        ("tags", "vectors, basics"),
    ];

    let resp = test::call_service(
        &app,
        upload_request(
            &token,
            multipart_body(&fields, Some(("vectors.pdf", "application/pdf", content))),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Upload successful");
    let material = &body["data"];
    let material_id = material["material_id"].as_str().unwrap().to_string();
    assert_eq!(material["course_code"], "MA201");
    assert_eq!(material["type"], "document");
    assert_eq!(material["file_info"]["original_name"], "vectors.pdf");
    assert_eq!(material["file_info"]["size_bytes"], content.len());
    assert!(material["file_info"].get("storage_path").is_none());
    assert_eq!(count_files(&upload_dir), 1);

    // Same bytes again: rejected, and the second copy does not stay on disk.
    let resp = test::call_service(
        &app,
        upload_request(
            &token,
            multipart_body(&fields, Some(("copy.pdf", "application/pdf", content))),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["duplicate"]["material_id"], material_id.as_str());
    assert_eq!(count_files(&upload_dir), 1);

    // Unsupported types never reach the disk.
    let resp = test::call_service(
        &app,
        upload_request(
            &token,
            multipart_body(&fields, Some(("photo.png", "image/png", &b"\x89PNG"[..]))),
        )
        .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(count_files(&upload_dir), 1);

    let req = upload_request(&token, multipart_body(&fields, None)).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::post()
        .uri(&format!("/api/materials/{}/download", material_id))
        .insert_header(bearer(&token))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("vectors.pdf"));
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.as_ref(), content);

    let stored = stores
        .materials
        .materials
        .read()
        .await
        .get(&material_id)
        .cloned()
        .unwrap();
    assert_eq!(stored.download_count, 1);
    assert_eq!(stored.tags, vec!["vectors", "basics"]);

    let req = test::TestRequest::get()
        .uri("/api/activities/me")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|a| a["action"].as_str())
        .collect();
    assert!(actions.contains(&"upload"));
    assert!(actions.contains(&"download"));
}

#[actix_web::test]
async fn test_public_material_listing() {
    let stores = Stores::new();
    let state = app_state(&stores, &scratch_dir("http-listing"));
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/api/materials?page=1&limit=5")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total"], 0);
    assert_eq!(body["pagination"]["limit"], 5);

    let req = test::TestRequest::get()
        .uri("/api/materials?page=9223372036854775807")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["hasPrev"], true);

    let req = test::TestRequest::get()
        .uri("/api/materials?type=spreadsheet")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/api/courses/CRS-missing").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
