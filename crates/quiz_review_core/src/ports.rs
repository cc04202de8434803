//! crates/quiz_review_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like storage
//! backends or completion providers.

use crate::domain::{Attempt, Quiz, User};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., storage, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// An ordered, finite sequence of text increments from a completion provider,
/// terminated by completion or by the first error.
pub type CompletionStream = Pin<Box<dyn Stream<Item = Result<String, PortError>> + Send>>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Read-only access to the stored quiz definitions and recorded attempts.
/// Lookups are exact matches by id; nothing in this crate ever writes back.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> PortResult<User>;

    async fn get_quiz(&self, quiz_id: &str) -> PortResult<Quiz>;

    async fn get_attempt(&self, user_id: &str, quiz_id: &str) -> PortResult<Attempt>;
}

/// A hosted large-language-model completion endpoint, invoked in streaming mode.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends a single flattened text prompt and returns a lazy sequence of
    /// text increments. The caller does not control the producer's pacing.
    async fn stream_completion(&self, prompt: &str) -> PortResult<CompletionStream>;
}
