use axum::{extract::Path, extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use crate::{
    errors::ApiError,
    extractors::AppJson,
    middlewares::auth::JwtClaims,
    models::question::VerifyAnswersRequest,
    services::{question_service::QuestionService, AppState},
};

/// GET /api/v1/questions/topic/{topic} - Active questions, options shuffled
pub async fn get_topic_questions(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(topic): Path<u8>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("User {} requesting questions for topic {}", claims.sub, topic);

    let service = QuestionService::new(state.mongo.clone());
    let questions = service.questions_for_topic(topic).await?;

    Ok(Json(json!({
        "success": true,
        "total": questions.len(),
        "questions": questions,
    })))
}

/// POST /api/v1/questions/verify - Score a submitted answer list
pub async fn verify_answers(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<VerifyAnswersRequest>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!(
        "User {} verifying {} answers",
        claims.sub,
        req.answers.len()
    );

    let service = QuestionService::new(state.mongo.clone());
    let report = service.verify_answers(&req.answers).await?;

    Ok(Json(json!({
        "success": true,
        "correct_count": report.correct_count,
        "total": report.total,
        "percentage": report.percentage,
        "passed": report.passed,
        "results": report.results,
    })))
}
