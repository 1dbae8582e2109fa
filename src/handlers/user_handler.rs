use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::{
    app_state::AppState,
    auth::{require_admin, AuthenticatedUser},
    errors::AppError,
    models::dto::{
        request::{CreateUserRequest, UpdateUserRequest, UserListQuery},
        response::ApiResponse,
    },
};

#[get("/api/users")]
async fn list_users(
    state: web::Data<Arc<AppState>>,
    query: web::Query<UserListQuery>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let page = state.user_service.list(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::paginated(page)))
}

#[get("/api/users/{id}")]
async fn get_user(
    state: web::Data<Arc<AppState>>,
    user_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let user = state.user_service.get(&user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(user)))
}

#[post("/api/users")]
async fn create_user(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateUserRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let user = state.user_service.create(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::with_message(user, "User created successfully")))
}

#[put("/api/users/{id}")]
async fn update_user(
    state: web::Data<Arc<AppState>>,
    user_id: web::Path<String>,
    request: web::Json<UpdateUserRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    let user = state
        .user_service
        .update(&user_id, request.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::with_message(user, "User updated successfully")))
}

#[delete("/api/users/{id}")]
async fn delete_user(
    state: web::Data<Arc<AppState>>,
    user_id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    require_admin(&auth.0)?;

    state.user_service.deactivate(&user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::message("User deactivated successfully")))
}
