// src/handlers/question.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    error::AppError,
    models::question::{
        CreateQuestionRequest, ImportQuestionsRequest, NewQuestion, PublicQuestion, Question,
        QuestionFilter, UpdateQuestionRequest,
    },
    storage::DynStorage,
};

/// Lists questions matching the optional category/subject/difficulty filter.
///
/// Answers and explanations are never part of this listing.
pub async fn list_questions(
    State(storage): State<DynStorage>,
    Query(filter): Query<QuestionFilter>,
) -> Result<impl IntoResponse, AppError> {
    let questions: Vec<PublicQuestion> = storage
        .list_questions(&filter)
        .await?
        .iter()
        .map(PublicQuestion::from)
        .collect();

    Ok(Json(questions))
}

pub async fn get_question(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = storage
        .get_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(PublicQuestion::from(&question)))
}

/// Creates a question. The full record, answer included, is returned.
/// Admin only.
pub async fn create_question(
    State(storage): State<DynStorage>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_question = payload.into_new_question()?;
    check_references(&storage, &new_question).await?;

    let question = storage.create_question(new_question).await?;
    tracing::info!(question_id = question.id, "Question created");

    Ok((StatusCode::CREATED, Json(question)))
}

/// Admin only. Questions that already have answers are frozen.
pub async fn update_question(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let current = storage
        .get_question(id)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    if storage.question_has_answers(id).await? {
        return Err(AppError::Conflict(
            "Question has recorded answers and cannot be changed".to_string(),
        ));
    }

    let merged = payload.apply_to(&current)?;
    check_references(&storage, &merged).await?;

    let question = storage
        .update_question(id, merged)
        .await?
        .ok_or(AppError::NotFound("Question not found".to_string()))?;

    Ok(Json(question))
}

/// Admin only.
pub async fn delete_question(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if storage.get_question(id).await?.is_none() {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    if storage.question_has_answers(id).await? {
        return Err(AppError::Conflict(
            "Question has recorded answers and cannot be deleted".to_string(),
        ));
    }

    storage.delete_question(id).await?;
    tracing::info!(question_id = id, "Question deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Bulk import. Invalid items are logged and skipped; the rest are stored.
/// Admin only.
pub async fn import_questions(
    State(storage): State<DynStorage>,
    Json(payload): Json<ImportQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let questions = import(&storage, payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "count": questions.len(),
            "questions": questions,
        })),
    ))
}

/// Shared by the import endpoint and startup seeding.
pub(crate) async fn import(
    storage: &DynStorage,
    payload: ImportQuestionsRequest,
) -> Result<Vec<Question>, AppError> {
    if let Some(subject_id) = payload.subject_id
        && storage.get_subject(subject_id).await?.is_none()
    {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    let mut imported = Vec::with_capacity(payload.questions.len());

    for (index, item) in payload.questions.into_iter().enumerate() {
        let mut new_question = match item.into_new_question() {
            Ok(q) => q,
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping invalid question in import");
                continue;
            }
        };
        if new_question.subject_id.is_none() {
            new_question.subject_id = payload.subject_id;
        }
        match check_references(storage, &new_question).await {
            Ok(()) => {}
            Err(e @ AppError::NotFound(_)) => {
                tracing::warn!(index, error = %e, "Skipping question with unknown reference");
                continue;
            }
            Err(e) => return Err(e),
        }
        imported.push(storage.create_question(new_question).await?);
    }

    tracing::info!(count = imported.len(), "Questions imported");

    Ok(imported)
}

/// The category and subject a question points at must exist.
async fn check_references(storage: &DynStorage, question: &NewQuestion) -> Result<(), AppError> {
    if let Some(category_id) = question.category_id
        && storage.get_category(category_id).await?.is_none()
    {
        return Err(AppError::NotFound(format!("Category {} not found", category_id)));
    }
    if let Some(subject_id) = question.subject_id
        && storage.get_subject(subject_id).await?.is_none()
    {
        return Err(AppError::NotFound(format!("Subject {} not found", subject_id)));
    }
    Ok(())
}
