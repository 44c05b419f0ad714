use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::{
    errors::ApiError,
    extractors::AppJson,
    middlewares::auth::{JwtClaims, JwtService},
    models::user::{LoginRequest, RegisterRequest},
    services::{auth_service::AuthService, AppState},
};

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub session_id: Option<String>,
}

fn auth_service(state: &AppState) -> AuthService {
    let jwt = JwtService::new(&state.config.jwt_secret);
    AuthService::new(state.mongo.clone(), jwt)
}

/// POST /api/v1/auth/register - Advisor self-registration
pub async fn register(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    tracing::info!("Registering new user: {}", req.email);

    let response = auth_service(&state).register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "User registered successfully",
            "token": response.token,
            "user": response.user,
        })),
    ))
}

/// POST /api/v1/auth/login - Login with email and password
pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    tracing::info!("Login attempt for user: {}", req.email);

    let ip = headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let response = auth_service(&state).login(req, ip, user_agent).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Login successful",
        "token": response.token,
        "session_id": response.session_id,
        "user": response.user,
    })))
}

/// POST /api/v1/auth/logout - Close the login session
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<LogoutRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::info!("Logging out user {}", claims.sub);

    auth_service(&state).logout(req.session_id.as_deref()).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Session closed successfully",
    })))
}

/// GET /api/v1/auth/me - Current authenticated user
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = auth_service(&state).current_user(&claims.sub).await?;

    Ok(Json(json!({
        "success": true,
        "user": profile,
    })))
}
