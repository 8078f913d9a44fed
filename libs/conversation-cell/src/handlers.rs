use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{ConversationError, MessageRequest, Session, TurnReply};
use crate::router::ConversationState;
use crate::services::orchestrator::WELCOME_MESSAGE;

fn to_app_error(error: ConversationError) -> AppError {
    match error {
        ConversationError::SessionNotFound(_) => AppError::NotFound(error.to_string()),
        ConversationError::EmptyMessage => AppError::BadRequest(error.to_string()),
        ConversationError::Extraction(_) | ConversationError::Rollback(_) => {
            AppError::Internal(error.to_string())
        }
    }
}

async fn find_session(
    state: &ConversationState,
    session_id: Uuid,
) -> Result<Arc<Mutex<Session>>, AppError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| to_app_error(ConversationError::SessionNotFound(session_id)))
}

#[axum::debug_handler]
pub async fn start_conversation(
    State(state): State<ConversationState>,
) -> Result<Json<Value>, AppError> {
    let session = state.sessions.create().await;

    let reply = TurnReply {
        session_id: session.id,
        stage: session.stage,
        messages: vec![WELCOME_MESSAGE.to_string()],
    };
    Ok(Json(json!(reply)))
}

#[axum::debug_handler]
pub async fn post_message(
    State(state): State<ConversationState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<MessageRequest>,
) -> Result<Json<Value>, AppError> {
    if request.text.trim().is_empty() {
        return Err(to_app_error(ConversationError::EmptyMessage));
    }

    let handle = find_session(&state, session_id).await?;
    let mut session = handle.lock().await;
    let messages = state.service.handle_turn(&mut session, &request.text).await;

    let reply = TurnReply {
        session_id,
        stage: session.stage,
        messages,
    };
    Ok(Json(json!(reply)))
}

#[axum::debug_handler]
pub async fn get_progress(
    State(state): State<ConversationState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let handle = find_session(&state, session_id).await?;
    let session = handle.lock().await;

    Ok(Json(json!(session.progress())))
}

#[axum::debug_handler]
pub async fn reset_conversation(
    State(state): State<ConversationState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let handle = find_session(&state, session_id).await?;
    let mut session = handle.lock().await;
    state
        .service
        .reset(&mut session)
        .await
        .map_err(to_app_error)?;

    Ok(Json(json!({
        "session_id": session_id,
        "stage": session.stage,
        "messages": [WELCOME_MESSAGE]
    })))
}
