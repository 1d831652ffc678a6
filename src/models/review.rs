// src/models/review.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::category::Category;

/// Represents the 'review_schedule' table: one row per (user, question).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewSchedule {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub next_review: chrono::DateTime<chrono::Utc>,
    pub interval_days: i32,
    /// Hundredths, 250 == 2.5.
    pub ease_factor: i32,
    /// Consecutive correct answers for this question.
    pub consecutive: i32,
}

/// Upsert payload keyed on `(user_id, question_id)`.
#[derive(Debug, Clone)]
pub struct NewReviewSchedule {
    pub user_id: i64,
    pub question_id: i64,
    pub next_review: chrono::DateTime<chrono::Utc>,
    pub interval_days: i32,
    pub ease_factor: i32,
    pub consecutive: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReviewListParams {
    /// Include reviews that are not due yet.
    #[serde(default)]
    pub all: bool,
}

/// A review joined with its question for the reminders list.
#[derive(Debug, Serialize)]
pub struct DueReview {
    pub id: i64,
    pub question_id: i64,
    pub prompt: String,
    pub difficulty: String,
    pub category: Option<Category>,
    pub due_date: chrono::DateTime<chrono::Utc>,
    pub interval_days: i32,
    pub consecutive: i32,
}
