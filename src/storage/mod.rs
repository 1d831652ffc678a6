// src/storage/mod.rs

//! Persistence boundary. Handlers and the quiz service only ever see
//! `dyn Storage`; the backend is picked once at startup.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{Answer, Attempt, NewAnswer},
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        question::{NewQuestion, Question, QuestionFilter},
        review::{NewReviewSchedule, ReviewSchedule},
        stats::{NewUserStats, UserStats},
        subject::{CreateSubjectRequest, Subject, UpdateSubjectRequest},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

pub type DynStorage = Arc<dyn Storage>;

#[async_trait]
pub trait Storage: Send + Sync {
    // Users
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, AppError>;
    async fn get_category(&self, id: i64) -> Result<Option<Category>, AppError>;
    /// Fails with `Conflict` when the name is taken.
    async fn create_category(&self, category: CreateCategoryRequest) -> Result<Category, AppError>;
    async fn update_category(
        &self,
        id: i64,
        patch: UpdateCategoryRequest,
    ) -> Result<Option<Category>, AppError>;
    async fn delete_category(&self, id: i64) -> Result<bool, AppError>;

    // Subjects
    async fn list_subjects(&self) -> Result<Vec<Subject>, AppError>;
    async fn get_subject(&self, id: i64) -> Result<Option<Subject>, AppError>;
    async fn create_subject(&self, subject: CreateSubjectRequest) -> Result<Subject, AppError>;
    async fn update_subject(
        &self,
        id: i64,
        patch: UpdateSubjectRequest,
    ) -> Result<Option<Subject>, AppError>;
    async fn delete_subject(&self, id: i64) -> Result<bool, AppError>;

    // Questions
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, AppError>;
    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError>;
    /// Returns the questions that exist among `ids`, in no particular order.
    async fn get_questions(&self, ids: &[i64]) -> Result<Vec<Question>, AppError>;
    async fn create_question(&self, question: NewQuestion) -> Result<Question, AppError>;
    async fn update_question(
        &self,
        id: i64,
        question: NewQuestion,
    ) -> Result<Option<Question>, AppError>;
    async fn delete_question(&self, id: i64) -> Result<bool, AppError>;
    /// Whether any answer row references the question.
    async fn question_has_answers(&self, id: i64) -> Result<bool, AppError>;

    // Attempts
    async fn create_attempt(&self, user_id: i64, question_ids: &[i64]) -> Result<Attempt, AppError>;
    async fn get_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError>;
    /// Newest first.
    async fn list_user_attempts(&self, user_id: i64) -> Result<Vec<Attempt>, AppError>;
    /// Sets `finished_at`, `score` and `time_spent` in one write. Last write wins.
    async fn finish_attempt(
        &self,
        id: i64,
        score: i32,
        time_spent: i32,
    ) -> Result<Option<Attempt>, AppError>;

    // Answers
    /// Inserts or replaces the answer for `(attempt_id, question_id)`.
    /// The flag is `true` when an earlier answer was replaced.
    async fn upsert_answer(&self, answer: NewAnswer) -> Result<(Answer, bool), AppError>;
    async fn list_answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AppError>;

    // User stats
    async fn list_user_stats(&self, user_id: i64) -> Result<Vec<UserStats>, AppError>;
    async fn get_user_stats(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<Option<UserStats>, AppError>;
    async fn upsert_user_stats(&self, stats: NewUserStats) -> Result<UserStats, AppError>;

    // Review schedule
    async fn list_reviews(&self, user_id: i64) -> Result<Vec<ReviewSchedule>, AppError>;
    async fn get_review(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<ReviewSchedule>, AppError>;
    async fn upsert_review(&self, review: NewReviewSchedule) -> Result<ReviewSchedule, AppError>;
}
