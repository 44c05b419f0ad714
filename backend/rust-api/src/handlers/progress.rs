use axum::{
    extract::{Path, State},
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
    middlewares::auth::JwtClaims,
    models::certificate::CertificateSummary,
    services::{certificate_service::CertificateService, progress_service::ProgressService, AppState},
};

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitEvaluationRequest {
    /// Evaluation result as an integer percentage, 0-100.
    #[validate(range(max = 100, message = "Percentage must be between 0 and 100"))]
    pub percentage: u32,
}

fn progress_service(state: &AppState) -> ProgressService {
    ProgressService::new(state.mongo.clone(), state.config.course_name.clone())
}

/// PUT /api/v1/progress/topic/{topic} - Submit an evaluation result
pub async fn update_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(topic): Path<u8>,
    AppJson(req): AppJson<SubmitEvaluationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    tracing::info!(
        "User {} submitting topic {} with {}%",
        claims.sub,
        topic,
        req.percentage
    );

    let outcome = progress_service(&state)
        .submit_evaluation(&claims.sub, topic, req.percentage)
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": outcome.message,
        "approved": outcome.approved,
        "percentage": outcome.percentage,
        "progress": outcome.progress,
        "all_topics_complete": outcome.all_topics_complete,
        "certificate": outcome.certificate,
    })))
}

/// GET /api/v1/progress - Current progress plus certificate summary
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let (progress, certificate) = progress_service(&state)
        .progress_for_user(&claims.sub)
        .await?;

    Ok(Json(json!({
        "success": true,
        "progress": progress,
        "certificate": certificate.as_ref().map(CertificateSummary::from),
    })))
}

/// GET /api/v1/progress/certificate - The caller's certificate with holder data
pub async fn get_certificate(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<impl IntoResponse, ApiError> {
    let (certificate, holder) = progress_service(&state)
        .own_certificate(&claims.sub)
        .await
        .map_err(|e| match e {
            crate::errors::ServiceError::NotFound("certificate") => ApiError::not_found(
                "No certificate yet. Complete all topics to receive one.",
            ),
            other => other.into(),
        })?;

    Ok(Json(json!({
        "success": true,
        "certificate": {
            "code": certificate.code,
            "issued_at": certificate.issued_at,
            "course": certificate.course,
            "final_score": certificate.final_score,
            "holder": {
                "name": holder.name,
                "id_number": holder.id_number,
            },
        },
    })))
}

/// GET /api/v1/certificates/verify/{code} - Public certificate verification
pub async fn verify_certificate(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = CertificateService::new(state.mongo.clone(), state.config.course_name.clone());
    let verified = service.verify_by_code(&code).await?;

    Ok(Json(json!({
        "success": true,
        "certificate": verified,
    })))
}
