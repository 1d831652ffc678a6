// src/handlers/subject.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::subject::{CreateSubjectRequest, UpdateSubjectRequest},
    storage::DynStorage,
    utils::html::clean_html,
};

pub async fn list_subjects(State(storage): State<DynStorage>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(storage.list_subjects().await?))
}

pub async fn get_subject(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let subject = storage
        .get_subject(id)
        .await?
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    Ok(Json(subject))
}

/// Creates a subject (a named question set).
/// Admin only.
pub async fn create_subject(
    State(storage): State<DynStorage>,
    Json(mut payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.description = payload.description.map(|d| clean_html(&d));

    let subject = storage.create_subject(payload).await?;
    tracing::info!(subject_id = subject.id, "Subject created");

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Admin only.
pub async fn update_subject(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
    Json(mut payload): Json<UpdateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    payload.description = payload.description.map(|d| clean_html(&d));

    let subject = storage
        .update_subject(id, payload)
        .await?
        .ok_or(AppError::NotFound("Subject not found".to_string()))?;

    Ok(Json(subject))
}

/// Admin only. Questions of the subject are kept, unassigned.
pub async fn delete_subject(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !storage.delete_subject(id).await? {
        return Err(AppError::NotFound("Subject not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
