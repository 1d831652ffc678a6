// src/models/attempt.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

use crate::{
    models::question::PublicQuestion,
    quiz::scoring::{CategoryScore, ScoreSummary},
};

/// Represents the 'attempts' table: one quiz-taking session.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub user_id: i64,
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Set exactly when the attempt is finished, together with `score` and `time_spent`.
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,

    /// Percentage 0..=100.
    pub score: Option<i32>,

    pub total_questions: i32,

    /// Seconds.
    pub time_spent: Option<i32>,

    /// The question set fixed at start, in presentation order.
    pub question_ids: Json<Vec<i64>>,
}

impl Attempt {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn contains_question(&self, question_id: i64) -> bool {
        self.question_ids.0.contains(&question_id)
    }
}

/// Represents the 'answers' table: one response to one question of an attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub attempt_id: i64,
    pub question_id: i64,
    pub chosen_answer: i32,
    pub correct: bool,
    pub time_spent: Option<i32>,
    pub answered_at: chrono::DateTime<chrono::Utc>,
}

/// Upsert payload keyed on `(attempt_id, question_id)`.
#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub attempt_id: i64,
    pub question_id: i64,
    pub chosen_answer: i32,
    pub correct: bool,
    pub time_spent: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartQuizRequest {
    /// At most 500 questions per attempt.
    #[serde(default)]
    #[validate(length(max = 500))]
    pub question_ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartQuizResponse {
    pub attempt_id: i64,
    pub total_questions: i32,
    pub questions: Vec<PublicQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: i64,
    pub chosen_answer: i32,
    pub time_spent: Option<i32>,
    #[serde(default)]
    pub is_last: bool,
}

/// Grading result for a single answer. The only place a correct answer is
/// revealed while an attempt is in progress.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerFeedback {
    pub correct: bool,
    pub correct_answer: i32,
    pub explanation: Option<String>,
    /// Present when this answer finished the attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScoreSummary>,
}

/// One question of an attempt as shown on the review screen.
#[derive(Debug, Serialize)]
pub struct ReviewedQuestion {
    #[serde(flatten)]
    pub question: PublicQuestion,
    pub chosen: Option<i32>,
    pub correct: Option<bool>,
    pub time_spent: Option<i32>,
    /// Revealed only once answered or once the attempt is finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptDetail {
    pub attempt: Attempt,
    pub summary: ScoreSummary,
    pub average_time_per_question: i64,
    pub categories: Vec<CategoryScore>,
    pub questions: Vec<ReviewedQuestion>,
}
