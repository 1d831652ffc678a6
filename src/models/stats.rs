// src/models/stats.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::category::Category;

/// Represents the 'user_stats' table: running totals per (user, category).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserStats {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub total_answers: i32,
    pub correct_answers: i32,
    /// Seconds, rounded.
    pub avg_time_per_question: Option<i32>,
    pub last_attempt: Option<chrono::DateTime<chrono::Utc>>,
    pub streak: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUserStats {
    pub user_id: i64,
    pub category_id: i64,
    pub total_answers: i32,
    pub correct_answers: i32,
    pub avg_time_per_question: Option<i32>,
    pub last_attempt: chrono::DateTime<chrono::Utc>,
    pub streak: i32,
}

#[derive(Debug, Serialize)]
pub struct UserStatsResponse {
    #[serde(flatten)]
    pub stats: UserStats,
    pub category: Option<Category>,
}
