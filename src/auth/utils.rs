use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
    models::domain::UserRole,
};

pub const NO_PERMISSION: &str = "You do not have permission to perform this action";
pub const NOT_AUTHORIZED: &str = "Not authorized";

pub fn require_roles(claims: &Claims, roles: &[UserRole]) -> AppResult<()> {
    if !roles.contains(&claims.role) {
        return Err(AppError::Forbidden(NO_PERMISSION.to_string()));
    }
    Ok(())
}

pub fn require_admin(claims: &Claims) -> AppResult<()> {
    require_roles(claims, &[UserRole::Admin])
}

/// Admins and lecturers.
pub fn require_staff(claims: &Claims) -> AppResult<()> {
    require_roles(claims, &[UserRole::Admin, UserRole::Lecturer])
}

pub fn require_owner_or_admin(claims: &Claims, resource_owner: &str) -> AppResult<()> {
    if claims.role != UserRole::Admin && claims.sub != resource_owner {
        return Err(AppError::Forbidden(NOT_AUTHORIZED.to_string()));
    }
    Ok(())
}
