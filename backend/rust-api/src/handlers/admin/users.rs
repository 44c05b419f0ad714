use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    errors::ApiError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::session::ListSessionsQuery,
    models::user::{CreateUserRequest, ListUsersQuery, ResetPasswordRequest, UpdateUserRequest},
    services::{
        progress_service::ProgressService, session_service::SessionService,
        user_management_service::UserManagementService, AppState,
    },
};

/// GET /admin/users - Paginated user listing with filters
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = UserManagementService::new(state.mongo.clone());
    let page = service.list_users(query).await?;

    Ok(Json(json!({
        "success": true,
        "total": page.total,
        "pages": page.pages,
        "page": page.page,
        "users": page.users,
    })))
}

/// POST /admin/users - Create a user (role may be chosen)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let service = UserManagementService::new(state.mongo.clone());
    let created = service.create_user(req).await?;

    tracing::info!("Admin {} created user {}", claims.sub, created.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User created successfully",
            "user": created,
        })),
    ))
}

/// GET /admin/users/{id} - Fetch one user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = UserManagementService::new(state.mongo.clone());
    let user = service.get_user(&user_id).await?;

    Ok(Json(json!({ "success": true, "user": user })))
}

/// PATCH /admin/users/{id} - Update profile fields, role or status
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let service = UserManagementService::new(state.mongo.clone());
    let updated = service.update_user(&user_id, req).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User updated successfully",
        "user": updated,
    })))
}

/// POST /admin/users/{id}/status - Toggle Active/Inactive
pub async fn toggle_user_status(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = UserManagementService::new(state.mongo.clone());
    let status = service.toggle_status(&user_id).await?;

    tracing::info!(
        "Admin {} set user {} status to {}",
        claims.sub,
        user_id,
        status.as_str()
    );

    Ok(Json(json!({
        "success": true,
        "message": "User status updated successfully",
        "status": status,
    })))
}

/// POST /admin/users/{id}/reset-password - Set a new password
pub async fn reset_user_password(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    AppJson(req): AppJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let service = UserManagementService::new(state.mongo.clone());
    service.reset_password(&user_id, &req.new_password).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset successfully",
    })))
}

/// POST /admin/users/{id}/reset-progress - Zero progress, delete certificate
pub async fn reset_user_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = ProgressService::new(state.mongo.clone(), state.config.course_name.clone());
    service.reset_progress(&user_id).await?;

    tracing::info!("Admin {} reset progress for user {}", claims.sub, user_id);

    Ok(Json(json!({
        "success": true,
        "message": "Progress reset successfully",
    })))
}

/// GET /admin/users/{id}/sessions - Login session history
pub async fn list_user_sessions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = SessionService::new(state.mongo.clone());
    let page = service.sessions_for_user(&user_id, query).await?;

    Ok(Json(json!({
        "success": true,
        "total": page.total,
        "pages": page.pages,
        "page": page.page,
        "total_connected_secs": page.total_connected_secs,
        "sessions": page.sessions,
    })))
}
