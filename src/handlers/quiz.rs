// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attempt::{StartQuizRequest, SubmitAnswerRequest},
        review::ReviewListParams,
    },
    quiz::QuizService,
    utils::jwt::Claims,
};

/// Starts a quiz attempt over the given question ids.
///
/// The returned questions carry no answers or explanations.
pub async fn start_quiz(
    State(quiz): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user_id = claims.user_id()?;
    let started = quiz.start(user_id, &payload.question_ids).await?;

    Ok((StatusCode::CREATED, Json(started)))
}

/// Grades one answer. With `is_last` set the attempt is finished and the
/// final score is included.
pub async fn submit_answer(
    State(quiz): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let feedback = quiz.submit_answer(user_id, attempt_id, payload).await?;

    Ok(Json(feedback))
}

/// Finishes an attempt early. Unanswered questions count as wrong.
pub async fn finish_quiz(
    State(quiz): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let attempt = quiz.finish_early(user_id, attempt_id).await?;

    Ok(Json(attempt))
}

pub async fn get_attempt(
    State(quiz): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let detail = quiz.attempt_detail(user_id, attempt_id).await?;

    Ok(Json(detail))
}

/// The current user's attempts, newest first.
pub async fn list_attempts(
    State(quiz): State<QuizService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(quiz.history(user_id).await?))
}

pub async fn get_user_stats(
    State(quiz): State<QuizService>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    Ok(Json(quiz.user_stats(user_id).await?))
}

/// Reviews due now. `?all=true` lists upcoming ones as well.
pub async fn list_reviews(
    State(quiz): State<QuizService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ReviewListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let reviews = quiz.due_reviews(user_id, Utc::now(), params.all).await?;

    Ok(Json(reviews))
}
