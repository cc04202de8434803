//! services/api/src/adapters/store.rs
//!
//! This module contains the attempt store adapter, which is the concrete
//! implementation of the `AttemptStore` port from the `core` crate. It reads
//! quiz definitions and recorded attempts out of a directory of JSON
//! collections, keyed the way the original client-side storage was:
//! `users.json`, `quizzes.json`, and one `attempts_<userId>.json` per user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_review_core::domain::{Attempt, Question, Quiz, User};
use quiz_review_core::ports::{AttemptStore, PortError, PortResult};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A file-backed adapter that implements the `AttemptStore` port.
#[derive(Clone)]
pub struct JsonStoreAdapter {
    data_path: PathBuf,
}

impl JsonStoreAdapter {
    /// Creates a new `JsonStoreAdapter` rooted at the given data directory.
    pub fn new(data_path: PathBuf) -> Self {
        Self { data_path }
    }

    /// Reads and deserializes one JSON collection file.
    async fn read_collection<T: DeserializeOwned>(&self, file_name: &str) -> PortResult<Vec<T>> {
        let path = self.data_path.join(file_name);
        let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PortError::NotFound(format!("Collection {} not found", file_name))
            } else {
                PortError::Unexpected(e.to_string())
            }
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            PortError::Unexpected(format!("Malformed collection {}: {}", file_name, e))
        })
    }
}

//=========================================================================================
// "Impure" Storage Record Structs
//=========================================================================================
// Field names mirror the stored JSON documents, which use camelCase keys.
//=========================================================================================

#[derive(Deserialize)]
struct UserRecord {
    id: String,
    name: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuestionRecord {
    id: String,
    question: String,
    options: Vec<String>,
    correct_answer: usize,
}
impl QuestionRecord {
    fn to_domain(self) -> Question {
        Question {
            id: self.id,
            prompt: self.question,
            options: self.options,
            correct_index: self.correct_answer,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizRecord {
    id: String,
    title: String,
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    questions: Vec<QuestionRecord>,
}
impl QuizRecord {
    fn to_domain(self) -> Quiz {
        Quiz {
            id: self.id,
            title: self.title,
            description: self.description,
            tags: self.tags,
            questions: self.questions.into_iter().map(|q| q.to_domain()).collect(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttemptRecord {
    quiz_id: String,
    score: u32,
    total_questions: u32,
    completed_at: DateTime<Utc>,
    time_elapsed: u64,
    answers: HashMap<String, usize>,
}
impl AttemptRecord {
    fn to_domain(self) -> Attempt {
        Attempt {
            quiz_id: self.quiz_id,
            score: self.score,
            total_questions: self.total_questions,
            completed_at: self.completed_at,
            time_elapsed_secs: self.time_elapsed,
            answers: self.answers,
        }
    }
}

//=========================================================================================
// `AttemptStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl AttemptStore for JsonStoreAdapter {
    async fn get_user(&self, user_id: &str) -> PortResult<User> {
        let users: Vec<UserRecord> = self.read_collection("users.json").await?;
        users
            .into_iter()
            .find(|u| u.id == user_id)
            .map(UserRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", user_id)))
    }

    async fn get_quiz(&self, quiz_id: &str) -> PortResult<Quiz> {
        let quizzes: Vec<QuizRecord> = self.read_collection("quizzes.json").await?;
        quizzes
            .into_iter()
            .find(|q| q.id == quiz_id)
            .map(QuizRecord::to_domain)
            .ok_or_else(|| PortError::NotFound(format!("Quiz {} not found", quiz_id)))
    }

    async fn get_attempt(&self, user_id: &str, quiz_id: &str) -> PortResult<Attempt> {
        let file_name = format!("attempts_{}.json", user_id);
        let attempts: Vec<AttemptRecord> = self.read_collection(&file_name).await?;
        attempts
            .into_iter()
            .find(|a| a.quiz_id == quiz_id)
            .map(AttemptRecord::to_domain)
            .ok_or_else(|| {
                PortError::NotFound(format!(
                    "Attempt for quiz {} by user {} not found",
                    quiz_id, user_id
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const QUIZZES: &str = r#"[
        {
            "id": "quiz-1",
            "title": "Rust Basics",
            "description": "Ownership and borrowing",
            "tags": ["rust"],
            "questions": [
                {
                    "id": "q1",
                    "question": "What does `let` do?",
                    "options": ["Binds a value", "Loops forever"],
                    "correctAnswer": 0
                }
            ]
        }
    ]"#;

    const USERS: &str = r#"[{"id": "u1", "name": "Ada"}]"#;

    const ATTEMPTS_U1: &str = r#"[
        {
            "quizId": "quiz-1",
            "score": 1,
            "totalQuestions": 1,
            "completedAt": "2024-03-01T12:00:00Z",
            "timeElapsed": 42,
            "answers": {"q1": 0}
        }
    ]"#;

    fn write_fixture_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quiz-review-store-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("users.json"), USERS).unwrap();
        std::fs::write(dir.join("quizzes.json"), QUIZZES).unwrap();
        std::fs::write(dir.join("attempts_u1.json"), ATTEMPTS_U1).unwrap();
        dir
    }

    #[tokio::test]
    async fn looks_up_records_by_exact_id() {
        let dir = write_fixture_dir();
        let store = JsonStoreAdapter::new(dir.clone());

        let user = store.get_user("u1").await.unwrap();
        assert_eq!(user.name, "Ada");

        let quiz = store.get_quiz("quiz-1").await.unwrap();
        assert_eq!(quiz.title, "Rust Basics");
        assert_eq!(quiz.questions[0].prompt, "What does `let` do?");
        assert_eq!(quiz.questions[0].correct_index, 0);

        let attempt = store.get_attempt("u1", "quiz-1").await.unwrap();
        assert_eq!(attempt.score, 1);
        assert_eq!(attempt.time_elapsed_secs, 42);
        assert_eq!(attempt.answers.get("q1"), Some(&0));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn missing_ids_and_files_are_not_found() {
        let dir = write_fixture_dir();
        let store = JsonStoreAdapter::new(dir.clone());

        assert!(matches!(
            store.get_quiz("quiz-404").await,
            Err(PortError::NotFound(_))
        ));
        assert!(matches!(
            store.get_user("nobody").await,
            Err(PortError::NotFound(_))
        ));
        // No attempts file exists for this user at all.
        assert!(matches!(
            store.get_attempt("u2", "quiz-1").await,
            Err(PortError::NotFound(_))
        ));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn malformed_collection_is_unexpected() {
        let dir = std::env::temp_dir().join(format!("quiz-review-store-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("quizzes.json"), "not json").unwrap();

        let store = JsonStoreAdapter::new(dir.clone());
        assert!(matches!(
            store.get_quiz("quiz-1").await,
            Err(PortError::Unexpected(_))
        ));

        let _ = std::fs::remove_dir_all(dir);
    }
}
