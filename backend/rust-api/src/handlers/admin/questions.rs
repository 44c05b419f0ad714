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
    models::question::{CreateQuestionRequest, ListQuestionsQuery, UpdateQuestionRequest},
    services::{question_service::QuestionService, AppState},
};

/// GET /admin/questions - Full listing, inactive questions included
pub async fn list_questions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuestionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuestionService::new(state.mongo.clone());
    let questions = service.list_questions(query).await?;

    Ok(Json(json!({
        "success": true,
        "total": questions.len(),
        "questions": questions,
    })))
}

/// POST /admin/questions - Create a question
pub async fn create_question(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<CreateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let service = QuestionService::new(state.mongo.clone());
    let question = service.create_question(req).await?;

    tracing::info!(
        "Admin {} created question {:?} for topic {}",
        claims.sub,
        question.id,
        question.topic
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Question created successfully",
            "question": question,
        })),
    ))
}

/// PUT /admin/questions/{id} - Update a question
pub async fn update_question(
    State(state): State<Arc<AppState>>,
    Path(question_id): Path<String>,
    AppJson(req): AppJson<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()
        .map_err(|e| ApiError::bad_request(format!("Validation error: {}", e)))?;

    let service = QuestionService::new(state.mongo.clone());
    let question = service.update_question(&question_id, req).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Question updated successfully",
        "question": question,
    })))
}

/// DELETE /admin/questions/{id} - Soft delete (question stays queryable)
pub async fn delete_question(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    Path(question_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let service = QuestionService::new(state.mongo.clone());
    service.soft_delete_question(&question_id).await?;

    tracing::info!("Admin {} deactivated question {}", claims.sub, question_id);

    Ok(Json(json!({
        "success": true,
        "message": "Question deleted successfully",
    })))
}
