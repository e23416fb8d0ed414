use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{
    CreateAutoGenerationRequest, DateRangeQuery, GenerateScheduleRequest, SetEnabledRequest,
    UpdateAutoGenerationRequest,
};
use crate::services::TickOutcome;
use crate::state::ScheduleState;

// ==============================================================================
// GENERATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn generate_schedule(
    State(state): State<Arc<ScheduleState>>,
    Json(request): Json<GenerateScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let result = state.service.generate_from_request(request).await?;

    Ok(Json(json!({
        "success": result.doctors_failed == 0,
        "partial": result.is_partial(),
        "result": result
    })))
}

#[axum::debug_handler]
pub async fn clear_doctor_slots(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    range.validate()?;

    let removed = state
        .service
        .clear_schedule(doctor_id, range.start_date, range.end_date)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "deleted": removed
    })))
}

#[axum::debug_handler]
pub async fn get_doctor_statistics(
    State(state): State<Arc<ScheduleState>>,
    Path(doctor_id): Path<Uuid>,
    Query(range): Query<DateRangeQuery>,
) -> Result<Json<Value>, AppError> {
    range.validate()?;

    let statistics = state
        .service
        .doctor_statistics(doctor_id, range.start_date, range.end_date)
        .await?;

    Ok(Json(json!(statistics)))
}

// ==============================================================================
// AUTO-GENERATION SETTINGS HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_auto_generation_settings(
    State(state): State<Arc<ScheduleState>>,
) -> Result<Json<Value>, AppError> {
    let settings = state.auto_settings.list().await?;

    Ok(Json(json!({
        "settings": settings,
        "total": settings.len()
    })))
}

#[axum::debug_handler]
pub async fn create_auto_generation_settings(
    State(state): State<Arc<ScheduleState>>,
    Json(request): Json<CreateAutoGenerationRequest>,
) -> Result<Json<Value>, AppError> {
    let created = state.auto_settings.create(request).await?;
    Ok(Json(json!(created)))
}

#[axum::debug_handler]
pub async fn get_auto_generation_settings(
    State(state): State<Arc<ScheduleState>>,
    Path(settings_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let settings = state.auto_settings.get(settings_id).await?;
    Ok(Json(json!(settings)))
}

#[axum::debug_handler]
pub async fn update_auto_generation_settings(
    State(state): State<Arc<ScheduleState>>,
    Path(settings_id): Path<Uuid>,
    Json(request): Json<UpdateAutoGenerationRequest>,
) -> Result<Json<Value>, AppError> {
    let updated = state.auto_settings.update(settings_id, request).await?;
    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn set_auto_generation_enabled(
    State(state): State<Arc<ScheduleState>>,
    Path(settings_id): Path<Uuid>,
    Json(request): Json<SetEnabledRequest>,
) -> Result<Json<Value>, AppError> {
    let updated = state
        .auto_settings
        .set_enabled(settings_id, request.is_enabled)
        .await?;
    Ok(Json(json!(updated)))
}

#[axum::debug_handler]
pub async fn delete_auto_generation_settings(
    State(state): State<Arc<ScheduleState>>,
    Path(settings_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    state.auto_settings.delete(settings_id).await?;

    Ok(Json(json!({
        "success": true,
        "id": settings_id
    })))
}

/// Manual trigger for one due-processing pass, sharing the scheduler's
/// single-flight guard.
#[axum::debug_handler]
pub async fn process_due_generations(
    State(state): State<Arc<ScheduleState>>,
) -> Result<Json<Value>, AppError> {
    match state.scheduler.run_once(Utc::now()).await {
        TickOutcome::Processed(processed) => Ok(Json(json!({
            "success": true,
            "processed": processed
        }))),
        TickOutcome::Skipped => Err(AppError::Conflict(
            "An auto-generation pass is already running".to_string(),
        )),
        TickOutcome::Failed(message) => Err(AppError::Database(message)),
    }
}

// ==============================================================================
// SCHEDULER LIFECYCLE HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_scheduler_status(
    State(state): State<Arc<ScheduleState>>,
) -> Result<Json<Value>, AppError> {
    let status = state.scheduler.status().await;
    Ok(Json(json!(status)))
}

#[axum::debug_handler]
pub async fn start_scheduler(
    State(state): State<Arc<ScheduleState>>,
) -> Result<Json<Value>, AppError> {
    let started = state.scheduler.start().await;
    info!("Scheduler start requested (started: {})", started);

    Ok(Json(json!({
        "started": started,
        "running": state.scheduler.is_running().await
    })))
}

#[axum::debug_handler]
pub async fn stop_scheduler(
    State(state): State<Arc<ScheduleState>>,
) -> Result<Json<Value>, AppError> {
    let stopped = state.scheduler.stop().await;
    info!("Scheduler stop requested (stopped: {})", stopped);

    Ok(Json(json!({
        "stopped": stopped,
        "running": state.scheduler.is_running().await
    })))
}
