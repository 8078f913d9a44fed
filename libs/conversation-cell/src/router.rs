use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::{ConversationService, SessionStore};

#[derive(Clone)]
pub struct ConversationState {
    pub service: Arc<ConversationService>,
    pub sessions: Arc<SessionStore>,
}

pub fn conversation_routes(state: ConversationState) -> Router {
    Router::new()
        .route("/", post(handlers::start_conversation))
        .route("/{session_id}/messages", post(handlers::post_message))
        .route("/{session_id}/progress", get(handlers::get_progress))
        .route("/{session_id}/reset", post(handlers::reset_conversation))
        .with_state(state)
}
