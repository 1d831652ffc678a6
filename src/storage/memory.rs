// src/storage/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

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
    storage::Storage,
};

/// Rows keyed by id with a monotonically increasing id allocator.
#[derive(Debug)]
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone> Table<T> {
    fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn get(&self, id: i64) -> Option<T> {
        self.rows.get(&id).cloned()
    }

    fn find(&self, pred: impl Fn(&T) -> bool) -> Option<(i64, T)> {
        self.rows
            .iter()
            .find(|(_, row)| pred(row))
            .map(|(id, row)| (*id, row.clone()))
    }

    fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.values().filter(|row| pred(row)).cloned().collect()
    }
}

#[derive(Debug, Default)]
struct Tables {
    users: Table<User>,
    categories: Table<Category>,
    subjects: Table<Subject>,
    questions: Table<Question>,
    attempts: Table<Attempt>,
    answers: Table<Answer>,
    user_stats: Table<UserStats>,
    reviews: Table<ReviewSchedule>,
}

/// Process-local store used when no database is configured, and by tests.
/// Mirrors the relational schema, including its unique keys and cascades.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    tables: RwLock<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut t = self.tables.write().await;
        if t.users.find(|u| u.username == user.username).is_some() {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        let id = t.users.allocate();
        let row = User {
            id,
            username: user.username,
            password: user.password,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            created_at: Utc::now(),
        };
        t.users.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(id))
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let t = self.tables.read().await;
        Ok(t.users.find(|u| u.username == username).map(|(_, u)| u))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.tables.read().await.categories.filter(|_| true))
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        Ok(self.tables.read().await.categories.get(id))
    }

    async fn create_category(&self, category: CreateCategoryRequest) -> Result<Category, AppError> {
        let mut t = self.tables.write().await;
        if t.categories.find(|c| c.name == category.name).is_some() {
            return Err(AppError::Conflict(format!(
                "Category '{}' already exists",
                category.name
            )));
        }
        let id = t.categories.allocate();
        let row = Category {
            id,
            name: category.name,
            color: category.color,
        };
        t.categories.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update_category(
        &self,
        id: i64,
        patch: UpdateCategoryRequest,
    ) -> Result<Option<Category>, AppError> {
        let mut t = self.tables.write().await;
        if let Some(name) = &patch.name {
            if t.categories.find(|c| &c.name == name && c.id != id).is_some() {
                return Err(AppError::Conflict(format!("Category '{}' already exists", name)));
            }
        }
        let Some(row) = t.categories.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(color) = patch.color {
            row.color = color;
        }
        Ok(Some(row.clone()))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        if t.categories.rows.remove(&id).is_none() {
            return Ok(false);
        }
        for q in t.questions.rows.values_mut() {
            if q.category_id == Some(id) {
                q.category_id = None;
            }
        }
        t.user_stats.rows.retain(|_, s| s.category_id != id);
        Ok(true)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, AppError> {
        Ok(self.tables.read().await.subjects.filter(|_| true))
    }

    async fn get_subject(&self, id: i64) -> Result<Option<Subject>, AppError> {
        Ok(self.tables.read().await.subjects.get(id))
    }

    async fn create_subject(&self, subject: CreateSubjectRequest) -> Result<Subject, AppError> {
        let mut t = self.tables.write().await;
        let id = t.subjects.allocate();
        let now = Utc::now();
        let row = Subject {
            id,
            name: subject.name,
            description: subject.description,
            created_at: now,
            updated_at: now,
        };
        t.subjects.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update_subject(
        &self,
        id: i64,
        patch: UpdateSubjectRequest,
    ) -> Result<Option<Subject>, AppError> {
        let mut t = self.tables.write().await;
        let Some(row) = t.subjects.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(description) = patch.description {
            row.description = Some(description);
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_subject(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        if t.subjects.rows.remove(&id).is_none() {
            return Ok(false);
        }
        for q in t.questions.rows.values_mut() {
            if q.subject_id == Some(id) {
                q.subject_id = None;
            }
        }
        Ok(true)
    }

    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, AppError> {
        Ok(self.tables.read().await.questions.filter(|q| filter.matches(q)))
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        Ok(self.tables.read().await.questions.get(id))
    }

    async fn get_questions(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        Ok(self.tables.read().await.questions.filter(|q| ids.contains(&q.id)))
    }

    async fn create_question(&self, question: NewQuestion) -> Result<Question, AppError> {
        let mut t = self.tables.write().await;
        let id = t.questions.allocate();
        let row = Question {
            id,
            prompt: question.prompt,
            options: Json(question.options),
            answer: question.answer,
            explanation: question.explanation,
            category_id: question.category_id,
            subject_id: question.subject_id,
            difficulty: question.difficulty,
            created_at: Utc::now(),
        };
        t.questions.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update_question(
        &self,
        id: i64,
        question: NewQuestion,
    ) -> Result<Option<Question>, AppError> {
        let mut t = self.tables.write().await;
        let Some(row) = t.questions.rows.get_mut(&id) else {
            return Ok(None);
        };
        row.prompt = question.prompt;
        row.options = Json(question.options);
        row.answer = question.answer;
        row.explanation = question.explanation;
        row.category_id = question.category_id;
        row.subject_id = question.subject_id;
        row.difficulty = question.difficulty;
        Ok(Some(row.clone()))
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let mut t = self.tables.write().await;
        if t.questions.rows.remove(&id).is_none() {
            return Ok(false);
        }
        t.reviews.rows.retain(|_, r| r.question_id != id);
        Ok(true)
    }

    async fn question_has_answers(&self, id: i64) -> Result<bool, AppError> {
        let t = self.tables.read().await;
        Ok(t.answers.find(|a| a.question_id == id).is_some())
    }

    async fn create_attempt(&self, user_id: i64, question_ids: &[i64]) -> Result<Attempt, AppError> {
        let mut t = self.tables.write().await;
        let id = t.attempts.allocate();
        let row = Attempt {
            id,
            user_id,
            started_at: Utc::now(),
            finished_at: None,
            score: None,
            total_questions: question_ids.len() as i32,
            time_spent: None,
            question_ids: Json(question_ids.to_vec()),
        };
        t.attempts.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn get_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        Ok(self.tables.read().await.attempts.get(id))
    }

    async fn list_user_attempts(&self, user_id: i64) -> Result<Vec<Attempt>, AppError> {
        let mut attempts = self
            .tables
            .read()
            .await
            .attempts
            .filter(|a| a.user_id == user_id);
        attempts.sort_by(|a, b| b.started_at.cmp(&a.started_at).then(b.id.cmp(&a.id)));
        Ok(attempts)
    }

    async fn finish_attempt(
        &self,
        id: i64,
        score: i32,
        time_spent: i32,
    ) -> Result<Option<Attempt>, AppError> {
        let mut t = self.tables.write().await;
        let Some(row) = t.attempts.rows.get_mut(&id) else {
            return Ok(None);
        };
        row.finished_at = Some(Utc::now());
        row.score = Some(score);
        row.time_spent = Some(time_spent);
        Ok(Some(row.clone()))
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<(Answer, bool), AppError> {
        let mut t = self.tables.write().await;
        let existing = t
            .answers
            .find(|a| a.attempt_id == answer.attempt_id && a.question_id == answer.question_id)
            .map(|(id, _)| id);
        let id = match existing {
            Some(id) => id,
            None => t.answers.allocate(),
        };
        let row = Answer {
            id,
            attempt_id: answer.attempt_id,
            question_id: answer.question_id,
            chosen_answer: answer.chosen_answer,
            correct: answer.correct,
            time_spent: answer.time_spent,
            answered_at: Utc::now(),
        };
        t.answers.rows.insert(id, row.clone());
        Ok((row, existing.is_some()))
    }

    async fn list_answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .answers
            .filter(|a| a.attempt_id == attempt_id))
    }

    async fn list_user_stats(&self, user_id: i64) -> Result<Vec<UserStats>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .user_stats
            .filter(|s| s.user_id == user_id))
    }

    async fn get_user_stats(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<Option<UserStats>, AppError> {
        let t = self.tables.read().await;
        Ok(t.user_stats
            .find(|s| s.user_id == user_id && s.category_id == category_id)
            .map(|(_, s)| s))
    }

    async fn upsert_user_stats(&self, stats: NewUserStats) -> Result<UserStats, AppError> {
        let mut t = self.tables.write().await;
        let existing = t
            .user_stats
            .find(|s| s.user_id == stats.user_id && s.category_id == stats.category_id)
            .map(|(id, _)| id);
        let id = match existing {
            Some(id) => id,
            None => t.user_stats.allocate(),
        };
        let row = UserStats {
            id,
            user_id: stats.user_id,
            category_id: stats.category_id,
            total_answers: stats.total_answers,
            correct_answers: stats.correct_answers,
            avg_time_per_question: stats.avg_time_per_question,
            last_attempt: Some(stats.last_attempt),
            streak: stats.streak,
        };
        t.user_stats.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn list_reviews(&self, user_id: i64) -> Result<Vec<ReviewSchedule>, AppError> {
        let mut reviews = self
            .tables
            .read()
            .await
            .reviews
            .filter(|r| r.user_id == user_id);
        reviews.sort_by_key(|r| (r.next_review, r.id));
        Ok(reviews)
    }

    async fn get_review(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<ReviewSchedule>, AppError> {
        let t = self.tables.read().await;
        Ok(t.reviews
            .find(|r| r.user_id == user_id && r.question_id == question_id)
            .map(|(_, r)| r))
    }

    async fn upsert_review(&self, review: NewReviewSchedule) -> Result<ReviewSchedule, AppError> {
        let mut t = self.tables.write().await;
        let existing = t
            .reviews
            .find(|r| r.user_id == review.user_id && r.question_id == review.question_id)
            .map(|(id, _)| id);
        let id = match existing {
            Some(id) => id,
            None => t.reviews.allocate(),
        };
        let row = ReviewSchedule {
            id,
            user_id: review.user_id,
            question_id: review.question_id,
            next_review: review.next_review,
            interval_days: review.interval_days,
            ease_factor: review.ease_factor,
            consecutive: review.consecutive,
        };
        t.reviews.rows.insert(id, row.clone());
        Ok(row)
    }
}
