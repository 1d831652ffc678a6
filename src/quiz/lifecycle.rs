//! Attempt lifecycle: start → answer* → finish.
//!
//! `Created` and `InProgress` are the same persisted state distinguished only
//! by answer count; `finished_at` is the single terminal flag.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        attempt::{
            AnswerFeedback, Attempt, AttemptDetail, NewAnswer, ReviewedQuestion,
            StartQuizResponse, SubmitAnswerRequest,
        },
        category::Category,
        question::{PublicQuestion, Question},
        review::{DueReview, NewReviewSchedule},
        stats::UserStatsResponse,
    },
    quiz::{
        progress::record_answer,
        scheduler::ReviewPolicy,
        scoring::{ScoreSummary, category_breakdown, score_answers},
    },
    storage::DynStorage,
};

#[derive(Clone)]
pub struct QuizService {
    storage: DynStorage,
    policy: ReviewPolicy,
}

impl QuizService {
    pub fn new(storage: DynStorage, policy: ReviewPolicy) -> Self {
        Self { storage, policy }
    }

    pub fn policy(&self) -> ReviewPolicy {
        self.policy
    }

    /// Creates an attempt over `question_ids` and returns the questions with
    /// their answers and explanations stripped.
    pub async fn start(
        &self,
        user_id: i64,
        question_ids: &[i64],
    ) -> Result<StartQuizResponse, AppError> {
        if question_ids.is_empty() {
            return Err(AppError::BadRequest("Question IDs are required".to_string()));
        }

        let unique: HashSet<i64> = question_ids.iter().copied().collect();
        if unique.len() != question_ids.len() {
            return Err(AppError::BadRequest(
                "Question IDs must not repeat".to_string(),
            ));
        }

        let found = self.questions_by_id(question_ids).await?;
        if let Some(missing) = question_ids.iter().find(|id| !found.contains_key(*id)) {
            return Err(AppError::NotFound(format!("Question {} not found", missing)));
        }

        let attempt = self.storage.create_attempt(user_id, question_ids).await?;

        let questions = question_ids
            .iter()
            .filter_map(|id| found.get(id))
            .map(PublicQuestion::from)
            .collect();

        tracing::info!(
            attempt_id = attempt.id,
            user_id,
            total_questions = attempt.total_questions,
            "Quiz attempt started"
        );

        Ok(StartQuizResponse {
            attempt_id: attempt.id,
            total_questions: attempt.total_questions,
            questions,
        })
    }

    /// Grades one answer, records it, and finishes the attempt when `is_last`.
    ///
    /// Re-answering a question replaces the earlier answer; the review schedule
    /// and stats keep the first graded response.
    pub async fn submit_answer(
        &self,
        user_id: i64,
        attempt_id: i64,
        req: SubmitAnswerRequest,
    ) -> Result<AnswerFeedback, AppError> {
        let attempt = self.owned_attempt(user_id, attempt_id).await?;

        if attempt.is_finished() {
            return Err(AppError::Conflict("Quiz attempt already finished".to_string()));
        }
        if !attempt.contains_question(req.question_id) {
            return Err(AppError::BadRequest(format!(
                "Question {} is not part of this attempt",
                req.question_id
            )));
        }

        let question = self
            .storage
            .get_question(req.question_id)
            .await?
            .ok_or(AppError::NotFound("Question not found".to_string()))?;

        let correct = question.is_correct(req.chosen_answer);
        let time_spent = req.time_spent.map(|t| t.max(0));
        let now = Utc::now();

        let (_, replaced) = self
            .storage
            .upsert_answer(NewAnswer {
                attempt_id,
                question_id: question.id,
                chosen_answer: req.chosen_answer,
                correct,
                time_spent,
            })
            .await?;

        // Review schedule and stats count a question once per attempt.
        if !replaced {
            self.record_progress(user_id, &question, correct, time_spent, now)
                .await?;
        }

        let result = if req.is_last {
            let (_, summary) = self.complete(&attempt).await?;
            Some(summary)
        } else {
            None
        };

        Ok(AnswerFeedback {
            correct,
            correct_answer: question.answer,
            explanation: question.explanation,
            result,
        })
    }

    /// Single write of score, time and `finished_at`. Last write wins.
    pub async fn finish(
        &self,
        attempt_id: i64,
        score: i32,
        time_spent: i32,
    ) -> Result<Attempt, AppError> {
        self.storage
            .finish_attempt(attempt_id, score, time_spent)
            .await?
            .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))
    }

    /// Finishes an attempt before every question was answered.
    pub async fn finish_early(&self, user_id: i64, attempt_id: i64) -> Result<Attempt, AppError> {
        let attempt = self.owned_attempt(user_id, attempt_id).await?;
        if attempt.is_finished() {
            return Err(AppError::Conflict("Quiz attempt already finished".to_string()));
        }
        let (attempt, _) = self.complete(&attempt).await?;
        Ok(attempt)
    }

    pub async fn attempt_detail(
        &self,
        user_id: i64,
        attempt_id: i64,
    ) -> Result<AttemptDetail, AppError> {
        let attempt = self.owned_attempt(user_id, attempt_id).await?;
        let answers = self.storage.list_answers(attempt_id).await?;
        let questions = self.questions_by_id(&attempt.question_ids.0).await?;

        let mut summary = score_answers(&answers);
        if attempt.is_finished() {
            summary = summary.against_total(attempt.total_questions);
        }
        let categories = category_breakdown(&answers, &questions);

        let by_question: HashMap<i64, _> = answers.iter().map(|a| (a.question_id, a)).collect();
        let finished = attempt.is_finished();

        let reviewed = attempt
            .question_ids
            .0
            .iter()
            .filter_map(|id| questions.get(id))
            .map(|q| {
                let answer = by_question.get(&q.id);
                let reveal = finished || answer.is_some();
                ReviewedQuestion {
                    question: PublicQuestion::from(q),
                    chosen: answer.map(|a| a.chosen_answer),
                    correct: answer.map(|a| a.correct),
                    time_spent: answer.and_then(|a| a.time_spent),
                    answer: reveal.then_some(q.answer),
                    explanation: if reveal { q.explanation.clone() } else { None },
                }
            })
            .collect();

        Ok(AttemptDetail {
            average_time_per_question: summary.average_time_per_question(),
            attempt,
            summary,
            categories,
            questions: reviewed,
        })
    }

    /// Attempts of a user, newest first.
    pub async fn history(&self, user_id: i64) -> Result<Vec<Attempt>, AppError> {
        self.storage.list_user_attempts(user_id).await
    }

    /// Reviews due at `now`, or every scheduled review when `include_upcoming`.
    pub async fn due_reviews(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        include_upcoming: bool,
    ) -> Result<Vec<DueReview>, AppError> {
        let reviews: Vec<_> = self
            .storage
            .list_reviews(user_id)
            .await?
            .into_iter()
            .filter(|r| include_upcoming || r.next_review <= now)
            .collect();

        let ids: Vec<i64> = reviews.iter().map(|r| r.question_id).collect();
        let questions = self.questions_by_id(&ids).await?;
        let categories = self.categories_by_id().await?;

        Ok(reviews
            .into_iter()
            .filter_map(|review| {
                let question = questions.get(&review.question_id)?;
                Some(DueReview {
                    id: review.id,
                    question_id: question.id,
                    prompt: question.prompt.clone(),
                    difficulty: question.difficulty.clone(),
                    category: question
                        .category_id
                        .and_then(|c| categories.get(&c).cloned()),
                    due_date: review.next_review,
                    interval_days: review.interval_days,
                    consecutive: review.consecutive,
                })
            })
            .collect())
    }

    /// Per-category statistics joined with their category.
    pub async fn user_stats(&self, user_id: i64) -> Result<Vec<UserStatsResponse>, AppError> {
        let stats = self.storage.list_user_stats(user_id).await?;
        let categories = self.categories_by_id().await?;

        Ok(stats
            .into_iter()
            .map(|stats| UserStatsResponse {
                category: categories.get(&stats.category_id).cloned(),
                stats,
            })
            .collect())
    }

    async fn owned_attempt(&self, user_id: i64, attempt_id: i64) -> Result<Attempt, AppError> {
        // Another user's attempt is reported as missing.
        self.storage
            .get_attempt(attempt_id)
            .await?
            .filter(|a| a.user_id == user_id)
            .ok_or(AppError::NotFound("Quiz attempt not found".to_string()))
    }

    /// Scores the attempt's own answers against its question count and finishes it.
    async fn complete(&self, attempt: &Attempt) -> Result<(Attempt, ScoreSummary), AppError> {
        let answers = self.storage.list_answers(attempt.id).await?;
        let summary = score_answers(&answers).against_total(attempt.total_questions);
        let finished = self
            .finish(attempt.id, summary.score, summary.time_spent_i32())
            .await?;

        tracing::info!(
            attempt_id = attempt.id,
            score = summary.score,
            correct = summary.correct_count,
            total = summary.total_count,
            "Quiz attempt finished"
        );

        Ok((finished, summary))
    }

    /// Advances the review schedule and, for categorized questions, the
    /// per-category stats.
    async fn record_progress(
        &self,
        user_id: i64,
        question: &Question,
        correct: bool,
        time_spent: Option<i32>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        self.reschedule(user_id, question.id, correct, now).await?;

        if let Some(category_id) = question.category_id {
            let previous = self.storage.get_user_stats(user_id, category_id).await?;
            let stats = record_answer(
                previous.as_ref(),
                user_id,
                category_id,
                correct,
                time_spent.unwrap_or(0),
                now,
            );
            self.storage.upsert_user_stats(stats).await?;
        }
        Ok(())
    }

    async fn reschedule(
        &self,
        user_id: i64,
        question_id: i64,
        correct: bool,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let previous = self.storage.get_review(user_id, question_id).await?;
        let update = self.policy.schedule(previous.as_ref(), correct, now);

        self.storage
            .upsert_review(NewReviewSchedule {
                user_id,
                question_id,
                next_review: update.next_review,
                interval_days: update.interval_days,
                ease_factor: update.ease_factor,
                consecutive: update.consecutive,
            })
            .await?;
        Ok(())
    }

    async fn questions_by_id(&self, ids: &[i64]) -> Result<HashMap<i64, Question>, AppError> {
        Ok(self
            .storage
            .get_questions(ids)
            .await?
            .into_iter()
            .map(|q| (q.id, q))
            .collect())
    }

    async fn categories_by_id(&self) -> Result<HashMap<i64, Category>, AppError> {
        Ok(self
            .storage
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect())
    }
}
