use std::sync::Arc;

use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_admin, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{ActivityListQuery, LimitQuery, PageQuery},
        response::ApiResponse,
    },
};

#[get("/api/activities")]
async fn list_activities(
    state: web::Data<Arc<AppState>>,
    query: web::Query<ActivityListQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let page = state.activity_service.list(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(page)))
}

#[get("/api/activities/me")]
async fn my_activities(
    state: web::Data<Arc<AppState>>,
    query: web::Query<LimitQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let activities = state
        .activity_service
        .mine(&auth.0, query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(activities)))
}

#[get("/api/activities/user/{user_id}")]
async fn user_activities(
    state: web::Data<Arc<AppState>>,
    user_id: web::Path<String>,
    query: web::Query<PageQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let page = state
        .activity_service
        .for_user(&auth.0, &user_id, query.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(page)))
}
