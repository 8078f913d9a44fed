use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::services::queue::OutboxQueue;

pub async fn get_queue_stats(
    State(queue): State<Arc<OutboxQueue>>,
) -> Result<Json<Value>, AppError> {
    let stats = queue.get_queue_stats().await;
    Ok(Json(json!(stats)))
}

pub async fn get_job_status(
    State(queue): State<Arc<OutboxQueue>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let job = queue
        .get_job(job_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Notification job {} not found", job_id)))?;

    Ok(Json(json!({
        "job_id": job.job_id,
        "kind": job.kind,
        "channel": job.channel,
        "status": job.status,
        "retry_count": job.retry_count,
        "max_retries": job.max_retries,
        "error_message": job.error_message,
        "delivered_at": job.delivered_at
    })))
}
