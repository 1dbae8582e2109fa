use std::sync::Arc;

use actix_web::{get, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_admin, require_staff, AuthenticatedUser},
    errors::AppError,
    models::dto::{request::DailyStatsQuery, response::ApiResponse},
};

#[get("/api/stats/overview")]
async fn overview(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let stats = state.stats_service.overview().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

#[get("/api/stats/daily")]
async fn daily(
    state: web::Data<Arc<AppState>>,
    query: web::Query<DailyStatsQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let stats = state.stats_service.daily(query.days).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

#[get("/api/stats/realtime")]
async fn realtime(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let stats = state.stats_service.realtime().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

#[get("/api/stats/campus/{campus}")]
async fn campus(
    state: web::Data<Arc<AppState>>,
    campus: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let stats = state.stats_service.campus(&campus).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

#[get("/api/stats/materials")]
async fn materials(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_staff(&auth.0)?;

    let stats = state.stats_service.materials().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}

#[get("/api/stats/users")]
async fn users(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let stats = state.stats_service.users().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(stats)))
}
