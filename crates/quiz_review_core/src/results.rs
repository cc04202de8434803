//! crates/quiz_review_core/src/results.rs
//!
//! The result renderer: pure presentation logic mapping a quiz and its
//! matching attempt into a scored summary and an annotated per-question
//! breakdown. No side effects and no errors - if either record is absent
//! the caller suppresses rendering entirely rather than signaling anything.

use crate::domain::{Attempt, Quiz};
use chrono::{DateTime, Utc};

/// Overall score as a whole percentage, rounded half-up.
pub fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * f64::from(score) / f64::from(total)).round() as u32
}

/// Formats an elapsed duration as `m:ss`.
pub fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// The three-tier classification of an overall percentage, driving both the
/// display color and the badge label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTier {
    High,
    Medium,
    Low,
}

impl ScoreTier {
    pub fn from_percentage(percentage: u32) -> Self {
        if percentage >= 80 {
            ScoreTier::High
        } else if percentage >= 60 {
            ScoreTier::Medium
        } else {
            ScoreTier::Low
        }
    }

    /// The badge label shown next to the score.
    pub fn label(self) -> &'static str {
        match self {
            ScoreTier::High => "Excellent!",
            ScoreTier::Medium => "Good Job!",
            ScoreTier::Low => "Keep Practicing!",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreTier::High => "high",
            ScoreTier::Medium => "medium",
            ScoreTier::Low => "low",
        }
    }
}

/// How a single option should be highlighted in the review list.
/// Every rendered option falls into exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    CorrectChosen,
    CorrectNotChosen,
    IncorrectChosen,
    Neutral,
}

/// One option row in a question's review.
#[derive(Debug, Clone)]
pub struct OptionView {
    pub text: String,
    pub mark: OptionMark,
}

/// The annotated review of a single question.
#[derive(Debug, Clone)]
pub struct QuestionReview {
    /// 1-based position in the quiz.
    pub number: usize,
    pub prompt: String,
    pub options: Vec<OptionView>,
    /// Whether the user's recorded answer was the correct option.
    /// An absent answer counts as incorrect.
    pub correct: bool,
    pub correct_answer: String,
    /// The text of the chosen option, or the "Not answered" marker.
    pub user_answer: String,
}

/// The complete rendered view of a finished attempt.
#[derive(Debug, Clone)]
pub struct ResultView {
    pub quiz_title: String,
    pub completed_at: DateTime<Utc>,
    pub percentage: u32,
    pub score: u32,
    pub total_questions: u32,
    pub tier: ScoreTier,
    pub badge: &'static str,
    pub time_display: String,
    pub questions: Vec<QuestionReview>,
}

/// The literal marker shown when a question id is missing from the
/// attempt's answer mapping.
pub const NOT_ANSWERED: &str = "Not answered";

/// Renders a quiz and its matching attempt into a `ResultView`.
pub fn render_results(quiz: &Quiz, attempt: &Attempt) -> ResultView {
    let percentage = percentage(attempt.score, attempt.total_questions);
    let tier = ScoreTier::from_percentage(percentage);

    let questions = quiz
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let chosen = attempt.answers.get(&question.id).copied();
            let correct = chosen == Some(question.correct_index);

            let options = question
                .options
                .iter()
                .enumerate()
                .map(|(opt_index, text)| {
                    let mark = if opt_index == question.correct_index {
                        if chosen == Some(opt_index) {
                            OptionMark::CorrectChosen
                        } else {
                            OptionMark::CorrectNotChosen
                        }
                    } else if chosen == Some(opt_index) {
                        OptionMark::IncorrectChosen
                    } else {
                        OptionMark::Neutral
                    };
                    OptionView {
                        text: text.clone(),
                        mark,
                    }
                })
                .collect();

            QuestionReview {
                number: index + 1,
                prompt: question.prompt.clone(),
                options,
                correct,
                correct_answer: question
                    .options
                    .get(question.correct_index)
                    .cloned()
                    .unwrap_or_default(),
                user_answer: chosen
                    .and_then(|i| question.options.get(i))
                    .cloned()
                    .unwrap_or_else(|| NOT_ANSWERED.to_string()),
            }
        })
        .collect();

    ResultView {
        quiz_title: quiz.title.clone(),
        completed_at: attempt.completed_at,
        percentage,
        score: attempt.score,
        total_questions: attempt.total_questions,
        tier,
        badge: tier.label(),
        time_display: format_time(attempt.time_elapsed_secs),
        questions,
    }
}
