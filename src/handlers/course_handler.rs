use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_admin, require_staff, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{CourseListQuery, CreateCourseRequest, LimitQuery, UpdateCourseRequest},
        response::ApiResponse,
    },
};

#[get("/api/courses")]
async fn list_courses(
    state: web::Data<Arc<AppState>>,
    query: web::Query<CourseListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = state.course_service.list(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(page)))
}

#[get("/api/courses/recommended")]
async fn recommended_courses(
    state: web::Data<Arc<AppState>>,
    query: web::Query<LimitQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let courses = state
        .course_service
        .recommended(&auth.0, query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(courses)))
}

#[get("/api/courses/{id}")]
async fn get_course(
    state: web::Data<Arc<AppState>>,
    course_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let course = state.course_service.get(&course_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(course)))
}

#[post("/api/courses")]
async fn create_course(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateCourseRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let course = state
        .course_service
        .create(&auth.0, request.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(
        course,
        "Course created successfully",
    )))
}

#[put("/api/courses/{id}")]
async fn update_course(
    state: web::Data<Arc<AppState>>,
    course_id: web::Path<String>,
    request: web::Json<UpdateCourseRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let course = state
        .course_service
        .update(&auth.0, &course_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(
        course,
        "Course updated successfully",
    )))
}

#[delete("/api/courses/{id}")]
async fn delete_course(
    state: web::Data<Arc<AppState>>,
    course_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    state.course_service.delete(&course_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Course deleted successfully")))
}
