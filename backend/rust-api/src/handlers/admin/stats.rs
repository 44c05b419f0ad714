use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use crate::{
    errors::ApiError,
    services::{stats_service::StatsService, AppState},
};

/// GET /admin/stats - Aggregate course statistics
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let service = StatsService::new(state.mongo.clone());
    let statistics = service.course_statistics().await?;

    Ok(Json(json!({
        "success": true,
        "statistics": statistics,
    })))
}
