//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use quiz_review_core::ports::PortError;
use quiz_review_core::results::{render_results, OptionMark, ResultView};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        get_results_handler,
        health_handler,
    ),
    components(
        schemas(ResultResponse, QuestionReviewDto, OptionDto)
    ),
    tags(
        (name = "Quiz Review API", description = "API endpoints for reviewing a completed quiz attempt.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One option row in a question review.
#[derive(Serialize, ToSchema)]
pub struct OptionDto {
    text: String,
    /// One of `correct-chosen`, `correct-not-chosen`, `incorrect-chosen`, `neutral`.
    mark: &'static str,
}

/// The annotated review of a single question.
#[derive(Serialize, ToSchema)]
pub struct QuestionReviewDto {
    number: usize,
    prompt: String,
    options: Vec<OptionDto>,
    correct: bool,
    correct_answer: String,
    user_answer: String,
}

/// The rendered view of a completed attempt.
#[derive(Serialize, ToSchema)]
pub struct ResultResponse {
    quiz_title: String,
    completed_at: DateTime<Utc>,
    percentage: u32,
    score: u32,
    total_questions: u32,
    /// One of `high`, `medium`, `low`; drives the display color client-side.
    tier: &'static str,
    badge: &'static str,
    time_display: String,
    questions: Vec<QuestionReviewDto>,
}

fn mark_name(mark: OptionMark) -> &'static str {
    match mark {
        OptionMark::CorrectChosen => "correct-chosen",
        OptionMark::CorrectNotChosen => "correct-not-chosen",
        OptionMark::IncorrectChosen => "incorrect-chosen",
        OptionMark::Neutral => "neutral",
    }
}

impl From<ResultView> for ResultResponse {
    fn from(view: ResultView) -> Self {
        Self {
            quiz_title: view.quiz_title,
            completed_at: view.completed_at,
            percentage: view.percentage,
            score: view.score,
            total_questions: view.total_questions,
            tier: view.tier.as_str(),
            badge: view.badge,
            time_display: view.time_display,
            questions: view
                .questions
                .into_iter()
                .map(|q| QuestionReviewDto {
                    number: q.number,
                    prompt: q.prompt,
                    options: q
                        .options
                        .into_iter()
                        .map(|o| OptionDto {
                            text: o.text,
                            mark: mark_name(o.mark),
                        })
                        .collect(),
                    correct: q.correct,
                    correct_answer: q.correct_answer,
                    user_answer: q.user_answer,
                })
                .collect(),
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Render a completed attempt as a scored summary with a per-question breakdown.
///
/// If the user, quiz, or attempt is absent, nothing is rendered: the response
/// is an empty 404.
#[utoipa::path(
    get,
    path = "/results/{user_id}/{quiz_id}",
    responses(
        (status = 200, description = "The rendered attempt review", body = ResultResponse),
        (status = 404, description = "The user, quiz, or attempt does not exist"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("user_id" = String, Path, description = "The id of the user who took the quiz."),
        ("quiz_id" = String, Path, description = "The id of the quiz."),
    )
)]
pub async fn get_results_handler(
    State(app_state): State<Arc<AppState>>,
    Path((user_id, quiz_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, StatusCode> {
    let store = &app_state.store;
    let result = async {
        store.get_user(&user_id).await?;
        let quiz = store.get_quiz(&quiz_id).await?;
        let attempt = store.get_attempt(&user_id, &quiz_id).await?;
        Ok::<_, PortError>(render_results(&quiz, &attempt))
    }
    .await;

    match result {
        Ok(view) => Ok(Json(ResultResponse::from(view))),
        Err(PortError::NotFound(_)) => Err(StatusCode::NOT_FOUND),
        Err(e) => {
            error!("Failed to render results: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "The service is up"))
)]
pub async fn health_handler() -> StatusCode {
    StatusCode::OK
}
