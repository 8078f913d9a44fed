use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers;
use crate::services::SlotAllocator;

pub fn doctor_routes(allocator: Arc<SlotAllocator>) -> Router {
    Router::new()
        .route("/", get(handlers::list_doctors))
        .route("/{doctor}/slots", get(handlers::get_day_slots))
        .with_state(allocator)
}
