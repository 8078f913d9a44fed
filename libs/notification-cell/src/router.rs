use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::{get_job_status, get_queue_stats};
use crate::services::queue::OutboxQueue;

pub fn notification_routes(queue: Arc<OutboxQueue>) -> Router {
    Router::new()
        .route("/stats", get(get_queue_stats))
        .route("/jobs/{job_id}", get(get_job_status))
        .with_state(queue)
}
