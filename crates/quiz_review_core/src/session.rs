//! crates/quiz_review_core/src/session.rs
//!
//! The chat session: an ordered transcript of exchanged messages plus the
//! state machine that admits at most one completion stream at a time.
//!
//! The session itself is synchronous. The driver that actually consumes the
//! provider stream lives in the service layer; it calls `begin`, then
//! `apply_delta` for each increment, and closes the turn with `finish` or
//! `fail`. Errors never escape a submission - failure is absorbed into the
//! transcript as a fixed apology and the session returns to `Idle`.

use crate::domain::{Attempt, Message, Quiz, Role};
use crate::results::NOT_ANSWERED;

/// The fixed instructional preamble prepended to every prompt.
pub const TUTOR_PREAMBLE: &str = "You are a helpful AI tutor providing feedback on a quiz. \
Use the quiz context to answer the user's questions about their performance, explain concepts, \
and provide educational guidance. Be encouraging and constructive in your responses.";

/// The message shown in place of the assistant's reply when a stream fails.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

/// Deterministically serializes the quiz+attempt snapshot into the grounding
/// block sent to the completion provider on every turn.
pub fn quiz_context(quiz: &Quiz, attempt: &Attempt) -> String {
    let mut ctx = String::new();
    ctx.push_str(&format!("Quiz Title: {}\n", quiz.title));
    ctx.push_str(&format!("Quiz Description: {}\n", quiz.description));
    ctx.push_str(&format!("Total Questions: {}\n", quiz.questions.len()));
    ctx.push_str(&format!(
        "User Score: {}/{}\n",
        attempt.score, attempt.total_questions
    ));
    ctx.push_str("\nQuestions and User's Answers:\n");

    for (index, question) in quiz.questions.iter().enumerate() {
        let chosen = attempt.answers.get(&question.id).copied();
        let is_correct = chosen == Some(question.correct_index);

        let options = question
            .options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}. {}", i + 1, opt))
            .collect::<Vec<_>>()
            .join(", ");

        ctx.push_str(&format!("\nQuestion {}: {}\n", index + 1, question.prompt));
        ctx.push_str(&format!("Options: {}\n", options));
        ctx.push_str(&format!(
            "Correct Answer: {}\n",
            question
                .options
                .get(question.correct_index)
                .map(String::as_str)
                .unwrap_or_default()
        ));
        ctx.push_str(&format!(
            "User's Answer: {}\n",
            chosen
                .and_then(|i| question.options.get(i))
                .map(String::as_str)
                .unwrap_or(NOT_ANSWERED)
        ));
        ctx.push_str(&format!(
            "Result: {}\n",
            if is_correct { "Correct" } else { "Incorrect" }
        ));
    }

    ctx
}

/// Folds the preamble, the grounding context, and the verbatim user question
/// into the single flattened prompt the provider receives each turn.
pub fn build_prompt(quiz: &Quiz, attempt: &Attempt, question: &str) -> String {
    format!(
        "{}\n\nQuiz Context:\n{}\n\nUser Question: {}",
        TUTOR_PREAMBLE,
        quiz_context(quiz, attempt),
        question
    )
}

/// Where the session currently is in a turn's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No call in flight; new submissions are accepted.
    Idle,
    /// A call has been issued but no content has arrived yet.
    AwaitingStream,
    /// Incremental content is arriving.
    Streaming,
}

/// Why a submission was rejected. Rejections are silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    EmptyInput,
    Busy,
}

/// The outcome of offering a submission to the session.
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    /// The turn was opened; the composed prompt should be sent to the provider.
    Accepted { prompt: String },
    Rejected(RejectReason),
}

/// A session-scoped chat over one quiz+attempt snapshot.
///
/// The transcript is append-only except for the in-place growth of the
/// trailing assistant message during an active stream. It is owned
/// exclusively by one session and never persisted.
pub struct ChatSession {
    quiz: Quiz,
    attempt: Attempt,
    transcript: Vec<Message>,
    phase: Phase,
}

impl ChatSession {
    pub fn new(quiz: Quiz, attempt: Attempt) -> Self {
        Self {
            quiz,
            attempt,
            transcript: Vec::new(),
            phase: Phase::Idle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Offers a submission. Accepted only while `Idle` and only for input
    /// with non-whitespace content; this enforces at most one concurrent
    /// stream per session.
    ///
    /// On acceptance the user turn and an empty assistant placeholder are
    /// appended, and the grounding context is rebuilt fresh from the
    /// quiz+attempt snapshot.
    pub fn begin(&mut self, input: &str) -> Submission {
        if self.phase != Phase::Idle {
            return Submission::Rejected(RejectReason::Busy);
        }
        let question = input.trim();
        if question.is_empty() {
            return Submission::Rejected(RejectReason::EmptyInput);
        }

        let prompt = build_prompt(&self.quiz, &self.attempt, question);
        self.transcript.push(Message {
            role: Role::User,
            content: question.to_string(),
        });
        self.transcript.push(Message {
            role: Role::Assistant,
            content: String::new(),
        });
        self.phase = Phase::AwaitingStream;
        Submission::Accepted { prompt }
    }

    /// Concatenates one text increment onto the trailing assistant message.
    /// Observers only ever see monotonically growing content.
    pub fn apply_delta(&mut self, delta: &str) {
        debug_assert!(self.phase != Phase::Idle, "delta outside an active turn");
        if let Some(last) = self.transcript.last_mut() {
            last.content.push_str(delta);
        }
        self.phase = Phase::Streaming;
    }

    /// Ends the turn successfully; the trailing message is now immutable.
    pub fn finish(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Ends the turn after a provider failure: the trailing assistant
    /// content is replaced with the fixed apology and the session returns
    /// to `Idle`, permitting a new submission. No retry is attempted.
    pub fn fail(&mut self) {
        if let Some(last) = self.transcript.last_mut() {
            if last.role == Role::Assistant {
                last.content.clear();
                last.content.push_str(APOLOGY);
            }
        }
        self.phase = Phase::Idle;
    }
}
