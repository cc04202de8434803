//! services/api/src/web/state.rs
//!
//! Defines the application's shared and connection-specific states.

use crate::config::Config;
use quiz_review_core::ports::{AttemptStore, CompletionService, PortResult};
use quiz_review_core::session::ChatSession;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AttemptStore>,
    pub completion: Arc<dyn CompletionService>,
    pub config: Arc<Config>,
}

//=========================================================================================
// ChatConnection (Specific to One WebSocket Connection)
//=========================================================================================

/// The state for a single, active chat connection.
pub struct ChatConnection {
    /// Identifies this connection in log output.
    pub connection_id: Uuid,
    pub user_id: String,
    /// The session owns the transcript; it is discarded with the connection.
    pub session: Arc<Mutex<ChatSession>>,
    /// Cancels any in-flight completion stream when the connection is torn down.
    pub cancellation_token: CancellationToken,
}

impl ChatConnection {
    /// Creates a new `ChatConnection` by fetching the required data from the
    /// attempt store. The user must exist and the quiz and attempt must both
    /// be present, otherwise the connection is denied.
    pub async fn new(app_state: Arc<AppState>, user_id: &str, quiz_id: &str) -> PortResult<Self> {
        let user = app_state.store.get_user(user_id).await?;
        let quiz = app_state.store.get_quiz(quiz_id).await?;
        let attempt = app_state.store.get_attempt(&user.id, quiz_id).await?;

        Ok(Self {
            connection_id: Uuid::new_v4(),
            user_id: user.id,
            session: Arc::new(Mutex::new(ChatSession::new(quiz, attempt))),
            cancellation_token: CancellationToken::new(),
        })
    }
}
