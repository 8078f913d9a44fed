use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::{LedgerService, ReminderService};

#[derive(Clone)]
pub struct AppointmentState {
    pub ledger: Arc<LedgerService>,
    pub reminders: Arc<ReminderService>,
}

pub fn appointment_routes(state: AppointmentState) -> Router {
    Router::new()
        .route("/", get(handlers::list_appointments))
        .route("/reminders/run", post(handlers::run_reminders))
        .with_state(state)
}
