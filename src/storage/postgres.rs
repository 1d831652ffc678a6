// src/storage/postgres.rs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

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

const USER_COLUMNS: &str = "id, username, password, email, display_name, role, created_at";
const QUESTION_COLUMNS: &str =
    "id, prompt, options, answer, explanation, category_id, subject_id, difficulty, created_at";
const ATTEMPT_COLUMNS: &str =
    "id, user_id, started_at, finished_at, score, total_questions, time_spent, question_ids";
const ANSWER_COLUMNS: &str =
    "id, attempt_id, question_id, chosen_answer, correct, time_spent, answered_at";
const STATS_COLUMNS: &str = "id, user_id, category_id, total_answers, correct_answers, \
     avg_time_per_question, last_attempt, streak";
const REVIEW_COLUMNS: &str =
    "id, user_id, question_id, next_review, interval_days, ease_factor, consecutive";

/// Answer row plus whether the upsert hit an existing row.
#[derive(sqlx::FromRow)]
struct UpsertedAnswer {
    #[sqlx(flatten)]
    answer: Answer,
    replaced: bool,
}

/// PostgreSQL backend. Schema lives in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies pending migrations.
    pub async fn migrate(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Maps a unique violation to `Conflict`, anything else to an internal error.
fn conflict_or_internal(err: sqlx::Error, message: String) -> AppError {
    let unique = matches!(&err, sqlx::Error::Database(db) if db.is_unique_violation());
    if unique {
        AppError::Conflict(message)
    } else {
        tracing::error!("Database error: {:?}", err);
        AppError::from(err)
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (username, password, email, display_name, role) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.email)
            .bind(&user.display_name)
            .bind(&user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                conflict_or_internal(e, format!("Username '{}' already exists", user.username))
            })
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name, color FROM categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name, color FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_category(&self, category: CreateCategoryRequest) -> Result<Category, AppError> {
        sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, color) VALUES ($1, $2) RETURNING id, name, color",
        )
        .bind(&category.name)
        .bind(&category.color)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_internal(e, format!("Category '{}' already exists", category.name)))
    }

    async fn update_category(
        &self,
        id: i64,
        patch: UpdateCategoryRequest,
    ) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                color = COALESCE($3, color)
            WHERE id = $1
            RETURNING id, name, color
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.color)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or_internal(e, "Category name already exists".to_string()))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_subjects(&self) -> Result<Vec<Subject>, AppError> {
        Ok(sqlx::query_as::<_, Subject>(
            "SELECT id, name, description, created_at, updated_at FROM subjects ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_subject(&self, id: i64) -> Result<Option<Subject>, AppError> {
        Ok(sqlx::query_as::<_, Subject>(
            "SELECT id, name, description, created_at, updated_at FROM subjects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_subject(&self, subject: CreateSubjectRequest) -> Result<Subject, AppError> {
        Ok(sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (name, description)
            VALUES ($1, $2)
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(&subject.name)
        .bind(&subject.description)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_subject(
        &self,
        id: i64,
        patch: UpdateSubjectRequest,
    ) -> Result<Option<Subject>, AppError> {
        Ok(sqlx::query_as::<_, Subject>(
            r#"
            UPDATE subjects
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, description, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(&patch.description)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_subject(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, AppError> {
        let sql = format!(
            r#"
            SELECT {QUESTION_COLUMNS}
            FROM questions
            WHERE ($1::BIGINT IS NULL OR category_id = $1)
              AND ($2::BIGINT IS NULL OR subject_id = $2)
              AND ($3::TEXT IS NULL OR difficulty = $3)
            ORDER BY id
            "#
        );
        Ok(sqlx::query_as::<_, Question>(&sql)
            .bind(filter.category)
            .bind(filter.subject)
            .bind(&filter.difficulty)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_question(&self, id: i64) -> Result<Option<Question>, AppError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1");
        Ok(sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_questions(&self, ids: &[i64]) -> Result<Vec<Question>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // Use QueryBuilder for dynamic IN clause
        let mut query_builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id IN ("
        ));
        let mut separated = query_builder.separated(",");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        Ok(query_builder
            .build_query_as::<Question>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_question(&self, question: NewQuestion) -> Result<Question, AppError> {
        let sql = format!(
            r#"
            INSERT INTO questions
            (prompt, options, answer, explanation, category_id, subject_id, difficulty)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUESTION_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Question>(&sql)
            .bind(&question.prompt)
            .bind(Json(&question.options))
            .bind(question.answer)
            .bind(&question.explanation)
            .bind(question.category_id)
            .bind(question.subject_id)
            .bind(&question.difficulty)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_question(
        &self,
        id: i64,
        question: NewQuestion,
    ) -> Result<Option<Question>, AppError> {
        let sql = format!(
            r#"
            UPDATE questions
            SET prompt = $2, options = $3, answer = $4, explanation = $5,
                category_id = $6, subject_id = $7, difficulty = $8
            WHERE id = $1
            RETURNING {QUESTION_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Question>(&sql)
            .bind(id)
            .bind(&question.prompt)
            .bind(Json(&question.options))
            .bind(question.answer)
            .bind(&question.explanation)
            .bind(question.category_id)
            .bind(question.subject_id)
            .bind(&question.difficulty)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_question(&self, id: i64) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn question_has_answers(&self, id: i64) -> Result<bool, AppError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM answers WHERE question_id = $1)")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_attempt(&self, user_id: i64, question_ids: &[i64]) -> Result<Attempt, AppError> {
        let sql = format!(
            r#"
            INSERT INTO attempts (user_id, total_questions, question_ids)
            VALUES ($1, $2, $3)
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Attempt>(&sql)
            .bind(user_id)
            .bind(question_ids.len() as i32)
            .bind(Json(question_ids))
            .fetch_one(&self.pool)
            .await?)
    }

    async fn get_attempt(&self, id: i64) -> Result<Option<Attempt>, AppError> {
        let sql = format!("SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE id = $1");
        Ok(sqlx::query_as::<_, Attempt>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_user_attempts(&self, user_id: i64) -> Result<Vec<Attempt>, AppError> {
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts WHERE user_id = $1 \
             ORDER BY started_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Attempt>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn finish_attempt(
        &self,
        id: i64,
        score: i32,
        time_spent: i32,
    ) -> Result<Option<Attempt>, AppError> {
        let sql = format!(
            r#"
            UPDATE attempts
            SET finished_at = NOW(), score = $2, time_spent = $3
            WHERE id = $1
            RETURNING {ATTEMPT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Attempt>(&sql)
            .bind(id)
            .bind(score)
            .bind(time_spent)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_answer(&self, answer: NewAnswer) -> Result<(Answer, bool), AppError> {
        // A freshly inserted row has xmax = 0; an ON CONFLICT update does not.
        let sql = format!(
            r#"
            INSERT INTO answers (attempt_id, question_id, chosen_answer, correct, time_spent)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (attempt_id, question_id) DO UPDATE SET
                chosen_answer = EXCLUDED.chosen_answer,
                correct = EXCLUDED.correct,
                time_spent = EXCLUDED.time_spent,
                answered_at = NOW()
            RETURNING {ANSWER_COLUMNS}, (xmax::text <> '0') AS replaced
            "#
        );
        let row = sqlx::query_as::<_, UpsertedAnswer>(&sql)
            .bind(answer.attempt_id)
            .bind(answer.question_id)
            .bind(answer.chosen_answer)
            .bind(answer.correct)
            .bind(answer.time_spent)
            .fetch_one(&self.pool)
            .await?;
        Ok((row.answer, row.replaced))
    }

    async fn list_answers(&self, attempt_id: i64) -> Result<Vec<Answer>, AppError> {
        let sql = format!("SELECT {ANSWER_COLUMNS} FROM answers WHERE attempt_id = $1 ORDER BY id");
        Ok(sqlx::query_as::<_, Answer>(&sql)
            .bind(attempt_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_user_stats(&self, user_id: i64) -> Result<Vec<UserStats>, AppError> {
        let sql = format!("SELECT {STATS_COLUMNS} FROM user_stats WHERE user_id = $1 ORDER BY id");
        Ok(sqlx::query_as::<_, UserStats>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_user_stats(
        &self,
        user_id: i64,
        category_id: i64,
    ) -> Result<Option<UserStats>, AppError> {
        let sql = format!(
            "SELECT {STATS_COLUMNS} FROM user_stats WHERE user_id = $1 AND category_id = $2"
        );
        Ok(sqlx::query_as::<_, UserStats>(&sql)
            .bind(user_id)
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_user_stats(&self, stats: NewUserStats) -> Result<UserStats, AppError> {
        let sql = format!(
            r#"
            INSERT INTO user_stats
            (user_id, category_id, total_answers, correct_answers,
             avg_time_per_question, last_attempt, streak)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, category_id) DO UPDATE SET
                total_answers = EXCLUDED.total_answers,
                correct_answers = EXCLUDED.correct_answers,
                avg_time_per_question = EXCLUDED.avg_time_per_question,
                last_attempt = EXCLUDED.last_attempt,
                streak = EXCLUDED.streak
            RETURNING {STATS_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, UserStats>(&sql)
            .bind(stats.user_id)
            .bind(stats.category_id)
            .bind(stats.total_answers)
            .bind(stats.correct_answers)
            .bind(stats.avg_time_per_question)
            .bind(stats.last_attempt)
            .bind(stats.streak)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_reviews(&self, user_id: i64) -> Result<Vec<ReviewSchedule>, AppError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM review_schedule WHERE user_id = $1 \
             ORDER BY next_review, id"
        );
        Ok(sqlx::query_as::<_, ReviewSchedule>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_review(
        &self,
        user_id: i64,
        question_id: i64,
    ) -> Result<Option<ReviewSchedule>, AppError> {
        let sql = format!(
            "SELECT {REVIEW_COLUMNS} FROM review_schedule WHERE user_id = $1 AND question_id = $2"
        );
        Ok(sqlx::query_as::<_, ReviewSchedule>(&sql)
            .bind(user_id)
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn upsert_review(&self, review: NewReviewSchedule) -> Result<ReviewSchedule, AppError> {
        let sql = format!(
            r#"
            INSERT INTO review_schedule
            (user_id, question_id, next_review, interval_days, ease_factor, consecutive)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, question_id) DO UPDATE SET
                next_review = EXCLUDED.next_review,
                interval_days = EXCLUDED.interval_days,
                ease_factor = EXCLUDED.ease_factor,
                consecutive = EXCLUDED.consecutive
            RETURNING {REVIEW_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, ReviewSchedule>(&sql)
            .bind(review.user_id)
            .bind(review.question_id)
            .bind(review.next_review)
            .bind(review.interval_days)
            .bind(review.ease_factor)
            .bind(review.consecutive)
            .fetch_one(&self.pool)
            .await?)
    }
}
