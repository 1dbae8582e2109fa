use std::sync::Arc;

use actix_web::{get, post, put, web, HttpRequest, HttpResponse};

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    handlers::request_metadata,
    models::dto::{
        request::{ChangePasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest},
        response::ApiResponse,
    },
};

/// Mounted by `configure` behind the failed-login limiter.
pub async fn login(
    state: web::Data<Arc<AppState>>,
    req: HttpRequest,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state
        .auth_service
        .login(request.into_inner(), request_metadata(&req))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(response)))
}

#[post("/api/auth/register")]
async fn register(
    state: web::Data<Arc<AppState>>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let response = state.auth_service.register(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(response)))
}

#[post("/api/auth/refresh")]
async fn refresh(
    state: web::Data<Arc<AppState>>,
    request: web::Json<RefreshTokenRequest>,
) -> Result<HttpResponse, AppError> {
    let tokens = state.auth_service.refresh(request.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tokens)))
}

#[post("/api/auth/logout")]
async fn logout(
    state: web::Data<Arc<AppState>>,
    request: Option<web::Json<RefreshTokenRequest>>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.map(|r| r.into_inner()).unwrap_or_default();
    state.auth_service.logout(request).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Logged out successfully")))
}

#[get("/api/auth/me")]
async fn me(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user = state.auth_service.me(&auth.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

#[put("/api/auth/change-password")]
async fn change_password(
    state: web::Data<Arc<AppState>>,
    request: web::Json<ChangePasswordRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state
        .auth_service
        .change_password(&auth.0, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("Password changed successfully")))
}
