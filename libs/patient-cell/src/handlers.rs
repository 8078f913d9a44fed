use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde_json::{json, Value};

use shared_models::error::AppError;

use crate::models::PatientLookupQuery;
use crate::services::IdentityResolver;

#[axum::debug_handler]
pub async fn lookup_patient(
    State(resolver): State<Arc<IdentityResolver>>,
    Query(query): Query<PatientLookupQuery>,
) -> Result<Json<Value>, AppError> {
    if query.name.is_none() && query.dob.is_none() {
        return Err(AppError::BadRequest("name or dob is required".to_string()));
    }

    let lookup = resolver
        .lookup(query.name.as_deref(), query.dob.as_deref())
        .await;

    Ok(Json(json!(lookup)))
}
