//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    AccountResponse, ChatRequest, ChatResponse, ErrorResponse, HistoryResponse, StateResponse,
    SuccessResponse,
};
use super::AppState;
use crate::ledger::LedgerErrorKind;
use crate::runtime::SessionError;
use crate::state_machine::TransitionError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat input
        .route("/api/chat", post(send_chat))
        // Pending transfer decisions
        .route("/api/confirm", post(confirm_pending))
        .route("/api/cancel", post(cancel_pending))
        // Ledger connectivity and queries
        .route("/api/connect", post(connect))
        .route("/api/balance/refresh", post(refresh_balance))
        .route("/api/account-info", post(account_info))
        .route("/api/history", post(history))
        // Session state
        .route("/api/state", get(get_state))
        .route("/api/stream", get(stream_session))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat and lifecycle actions
// ============================================================

async fn send_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let outcome = state.session.submit_free_text(text).await?;
    let hint = outcome.hint();
    Ok(Json(ChatResponse { outcome, hint }))
}

async fn confirm_pending(State(state): State<AppState>) -> Result<Json<SuccessResponse>, AppError> {
    state.session.confirm_pending().await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn cancel_pending(State(state): State<AppState>) -> Result<Json<SuccessResponse>, AppError> {
    state.session.cancel_pending().await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Ledger queries
// ============================================================

async fn connect(State(state): State<AppState>) -> Result<Json<StateResponse>, AppError> {
    state.session.connect().await?;
    Ok(Json(current_state(&state)))
}

async fn refresh_balance(State(state): State<AppState>) -> Result<Json<AccountResponse>, AppError> {
    let snapshot = state.session.refresh_balance().await?;
    Ok(Json(AccountResponse { snapshot }))
}

async fn account_info(State(state): State<AppState>) -> Result<Json<AccountResponse>, AppError> {
    let snapshot = state.session.request_account_info().await?;
    Ok(Json(AccountResponse { snapshot }))
}

async fn history(State(state): State<AppState>) -> Result<Json<HistoryResponse>, AppError> {
    let entries = state.session.request_history().await?;
    Ok(Json(HistoryResponse { entries }))
}

// ============================================================
// Session state
// ============================================================

async fn get_state(State(state): State<AppState>) -> Json<StateResponse> {
    Json(current_state(&state))
}

async fn stream_session(State(state): State<AppState>) -> impl IntoResponse {
    // Subscribe before reading state so nothing falls between the two
    let broadcast_rx = state.session.subscribe();
    sse_stream(current_state(&state), broadcast_rx)
}

fn current_state(state: &AppState) -> StateResponse {
    StateResponse {
        state: state.session.state(),
        connected: state.session.is_connected(),
        snapshot: state.session.snapshot(),
    }
}

async fn get_version() -> &'static str {
    concat!("xrp-chat ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl From<SessionError> for AppError {
    fn from(error: SessionError) -> Self {
        let message = error.to_string();
        match error {
            SessionError::Transition(TransitionError::NoPendingTransfer) => {
                AppError::BadRequest(message)
            }
            SessionError::Transition(
                TransitionError::TransferAlreadyPending | TransitionError::SubmissionInFlight,
            ) => AppError::Conflict(message),
            SessionError::Ledger(e)
                if matches!(e.kind, LedgerErrorKind::Network | LedgerErrorKind::Timeout) =>
            {
                AppError::Unavailable(message)
            }
            SessionError::Ledger(e) if e.kind == LedgerErrorKind::NotFound => {
                AppError::BadRequest(message)
            }
            SessionError::Ledger(_)
            | SessionError::Transition(TransitionError::InvalidTransition(_))
            | SessionError::Closed => AppError::Internal(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
