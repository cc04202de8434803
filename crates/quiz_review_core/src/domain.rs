//! crates/quiz_review_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage or serialization format.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// A quiz definition. Immutable once loaded from the attempt store.
#[derive(Debug, Clone)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub questions: Vec<Question>,
}

/// A single multiple-choice question.
///
/// Invariant: `correct_index` is within the bounds of `options`.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
}

/// A recorded run through a quiz.
///
/// `answers` maps question id to the chosen option index; entries may be
/// absent for questions the user never answered.
/// Invariant: `score <= total_questions`.
#[derive(Debug, Clone)]
pub struct Attempt {
    pub quiz_id: String,
    pub score: u32,
    pub total_questions: u32,
    pub completed_at: DateTime<Utc>,
    pub time_elapsed_secs: u64,
    pub answers: HashMap<String, usize>,
}

/// Represents a user - validated at the load boundary before a chat
/// session is allowed to start.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// The author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A single turn in the chat transcript.
///
/// Messages are immutable once appended, except for the trailing assistant
/// message, whose content grows in place while a reply is streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}
