// src/handlers/category.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::category::{CreateCategoryRequest, UpdateCategoryRequest},
    storage::DynStorage,
};

/// Lists all categories.
pub async fn list_categories(
    State(storage): State<DynStorage>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(storage.list_categories().await?))
}

pub async fn get_category(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let category = storage
        .get_category(id)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Creates a category.
/// Admin only.
pub async fn create_category(
    State(storage): State<DynStorage>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = storage.create_category(payload).await?;
    tracing::info!(category_id = category.id, "Category created");

    Ok((StatusCode::CREATED, Json(category)))
}

/// Updates a category's name and/or color.
/// Admin only.
pub async fn update_category(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = storage
        .update_category(id, payload)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Deletes a category. Its questions become uncategorized.
/// Admin only.
pub async fn delete_category(
    State(storage): State<DynStorage>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !storage.delete_category(id).await? {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
