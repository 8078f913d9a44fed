use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::{ScheduleError, SlotQuery};
use crate::services::SlotAllocator;

fn to_app_error(error: ScheduleError) -> AppError {
    match error {
        ScheduleError::InvalidDate(_) => AppError::ValidationError(error.to_string()),
        ScheduleError::NotScheduled { .. } => AppError::NotFound(error.to_string()),
        ScheduleError::Store(e) if e.is_missing() => AppError::NotFound(e.to_string()),
        ScheduleError::Store(e) => AppError::Storage(e.to_string()),
    }
}

#[axum::debug_handler]
pub async fn list_doctors(
    State(allocator): State<Arc<SlotAllocator>>,
) -> Result<Json<Value>, AppError> {
    let doctors = allocator.list_providers().await.map_err(to_app_error)?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len()
    })))
}

#[axum::debug_handler]
pub async fn get_day_slots(
    State(allocator): State<Arc<SlotAllocator>>,
    Path(doctor): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = allocator
        .day_slots(&doctor, &query.date)
        .await
        .map_err(to_app_error)?;
    let available = slots.iter().filter(|slot| slot.status.is_available()).count();

    Ok(Json(json!({
        "doctor": doctor,
        "date": query.date,
        "slots": slots,
        "available": available
    })))
}
