use std::sync::Arc;

use axum::{routing::get, Router};

use crate::handlers::*;
use crate::services::IdentityResolver;

pub fn patient_routes(resolver: Arc<IdentityResolver>) -> Router {
    Router::new()
        .route("/lookup", get(lookup_patient))
        .with_state(resolver)
}
