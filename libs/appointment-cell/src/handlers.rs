use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_utils::parse_dmy;

use crate::models::{AppointmentError, BookingStatus};
use crate::router::AppointmentState;

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<BookingStatus>,
    pub doctor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReminderRunQuery {
    /// Sweep as if today were this `DD-MM-YYYY` date.
    pub date: Option<String>,
}

fn to_app_error(error: AppointmentError) -> AppError {
    match error {
        AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
        other => AppError::Storage(other.to_string()),
    }
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppointmentState>,
    Query(query): Query<AppointmentListQuery>,
) -> Result<Json<Value>, AppError> {
    let entries: Vec<_> = state
        .ledger
        .entries()
        .await
        .map_err(to_app_error)?
        .into_iter()
        .filter(|entry| query.status.map_or(true, |status| entry.status == status))
        .filter(|entry| {
            query
                .doctor
                .as_deref()
                .map_or(true, |doctor| entry.doctor_name.eq_ignore_ascii_case(doctor))
        })
        .collect();

    Ok(Json(json!({
        "appointments": entries,
        "total": entries.len()
    })))
}

#[axum::debug_handler]
pub async fn run_reminders(
    State(state): State<AppointmentState>,
    Query(query): Query<ReminderRunQuery>,
) -> Result<Json<Value>, AppError> {
    let today = match query.date.as_deref() {
        Some(raw) => parse_dmy(raw).ok_or_else(|| {
            AppError::ValidationError(format!("Invalid date format: {}. Please use DD-MM-YYYY", raw))
        })?,
        None => Local::now().date_naive(),
    };

    let report = state.reminders.sweep(today).await.map_err(to_app_error)?;
    Ok(Json(json!({
        "date": shared_utils::format_dmy(today),
        "report": report
    })))
}
