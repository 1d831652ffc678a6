// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::{error::AppError, utils::html::clean_html};

pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "hard"];

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    /// The text shown to the user.
    pub prompt: String,

    /// Ordered answer options. Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// Index into `options` of the correct option.
    pub answer: i32,

    /// Explanation shown after the question is graded.
    pub explanation: Option<String>,

    pub category_id: Option<i64>,

    pub subject_id: Option<i64>,

    /// One of `DIFFICULTIES`.
    pub difficulty: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Question {
    pub fn is_correct(&self, chosen: i32) -> bool {
        self.answer == chosen
    }
}

/// DTO for sending question to client (excludes answer and explanation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub prompt: String,
    pub options: Vec<String>,
    pub category_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub difficulty: String,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            prompt: q.prompt.clone(),
            options: q.options.0.clone(),
            category_id: q.category_id,
            subject_id: q.subject_id,
            difficulty: q.difficulty.clone(),
        }
    }
}

/// Query parameters for listing questions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionFilter {
    pub category: Option<i64>,
    pub subject: Option<i64>,
    pub difficulty: Option<String>,
}

impl QuestionFilter {
    pub fn matches(&self, q: &Question) -> bool {
        self.category.is_none_or(|c| q.category_id == Some(c))
            && self.subject.is_none_or(|s| q.subject_id == Some(s))
            && self
                .difficulty
                .as_deref()
                .is_none_or(|d| q.difficulty == d)
    }
}

/// Insert/replace payload handed to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: i32,
    pub explanation: Option<String>,
    pub category_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub difficulty: String,
}

impl NewQuestion {
    /// Cross-field check the derive cannot express: the answer must index an option.
    pub fn check_answer_index(&self) -> Result<(), AppError> {
        if self.answer < 0 || self.answer as usize >= self.options.len() {
            return Err(AppError::BadRequest(format!(
                "answer index {} is out of range for {} options",
                self.answer,
                self.options.len()
            )));
        }
        Ok(())
    }
}

fn default_difficulty() -> String {
    "medium".to_string()
}

/// DTO for creating a new question.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    pub answer: i32,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
    pub category_id: Option<i64>,
    pub subject_id: Option<i64>,
    #[serde(default = "default_difficulty")]
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: String,
}

impl CreateQuestionRequest {
    /// Validates the request and converts it into a store payload.
    pub fn into_new_question(self) -> Result<NewQuestion, AppError> {
        self.validate()?;

        let question = NewQuestion {
            prompt: self.prompt,
            options: self.options,
            answer: self.answer,
            explanation: self.explanation.map(|e| clean_html(&e)),
            category_id: self.category_id,
            subject_id: self.subject_id,
            difficulty: self.difficulty,
        };
        question.check_answer_index()?;

        Ok(question)
    }
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub prompt: Option<String>,
    #[validate(custom(function = validate_options))]
    pub options: Option<Vec<String>>,
    pub answer: Option<i32>,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
    pub category_id: Option<i64>,
    pub subject_id: Option<i64>,
    #[validate(custom(function = validate_difficulty))]
    pub difficulty: Option<String>,
}

impl UpdateQuestionRequest {
    /// Overlays the present fields on `current` and re-checks the result.
    pub fn apply_to(self, current: &Question) -> Result<NewQuestion, AppError> {
        self.validate()?;

        let merged = NewQuestion {
            prompt: self.prompt.unwrap_or_else(|| current.prompt.clone()),
            options: self.options.unwrap_or_else(|| current.options.0.clone()),
            answer: self.answer.unwrap_or(current.answer),
            explanation: self
                .explanation
                .map(|e| clean_html(&e))
                .or_else(|| current.explanation.clone()),
            category_id: self.category_id.or(current.category_id),
            subject_id: self.subject_id.or(current.subject_id),
            difficulty: self.difficulty.unwrap_or_else(|| current.difficulty.clone()),
        };
        merged.check_answer_index()?;

        Ok(merged)
    }
}

/// DTO for bulk import. Items failing validation are skipped, not fatal.
#[derive(Debug, Deserialize)]
pub struct ImportQuestionsRequest {
    pub subject_id: Option<i64>,
    pub questions: Vec<CreateQuestionRequest>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    if options.is_empty() {
        return Err(validator::ValidationError::new("options_cannot_be_empty"));
    }
    for opt in options {
        if opt.trim().is_empty() {
            return Err(validator::ValidationError::new("option_cannot_be_blank"));
        }
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}

fn validate_difficulty(difficulty: &str) -> Result<(), validator::ValidationError> {
    if DIFFICULTIES.contains(&difficulty) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("difficulty_must_be_easy_medium_or_hard"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateQuestionRequest {
        CreateQuestionRequest {
            prompt: "Which keyword declares an immutable binding?".into(),
            options: vec!["let".into(), "var".into(), "mut".into()],
            answer: 0,
            explanation: Some("<b>let</b> is immutable by default<script>x()</script>".into()),
            category_id: None,
            subject_id: None,
            difficulty: "easy".into(),
        }
    }

    #[test]
    fn valid_request_converts_and_sanitizes_explanation() {
        let q = request().into_new_question().unwrap();
        assert_eq!(q.options.len(), 3);
        let explanation = q.explanation.unwrap();
        assert!(explanation.contains("<b>let</b>"));
        assert!(!explanation.contains("script"));
    }

    #[test]
    fn empty_options_are_rejected() {
        let mut req = request();
        req.options.clear();
        req.answer = 0;
        assert!(matches!(req.into_new_question(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn answer_must_index_an_option() {
        let mut req = request();
        req.answer = 3;
        assert!(matches!(req.into_new_question(), Err(AppError::BadRequest(_))));

        let mut req = request();
        req.answer = -1;
        assert!(matches!(req.into_new_question(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn unknown_difficulty_is_rejected() {
        let mut req = request();
        req.difficulty = "brutal".into();
        assert!(req.into_new_question().is_err());
    }

    #[test]
    fn difficulty_defaults_to_medium() {
        let req: CreateQuestionRequest = serde_json::from_value(serde_json::json!({
            "prompt": "2 + 2?",
            "options": ["3", "4"],
            "answer": 1
        }))
        .unwrap();
        assert_eq!(req.difficulty, "medium");
    }

    #[test]
    fn public_question_has_no_answer_or_explanation() {
        let q = Question {
            id: 5,
            prompt: "p".into(),
            options: Json(vec!["a".into(), "b".into()]),
            answer: 1,
            explanation: Some("because".into()),
            category_id: Some(1),
            subject_id: None,
            difficulty: "hard".into(),
            created_at: chrono::Utc::now(),
        };
        let value = serde_json::to_value(PublicQuestion::from(&q)).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("answer"));
        assert!(!obj.contains_key("explanation"));
        assert_eq!(obj["options"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn filter_matches_on_all_present_fields() {
        let q = Question {
            id: 1,
            prompt: "p".into(),
            options: Json(vec!["a".into()]),
            answer: 0,
            explanation: None,
            category_id: Some(2),
            subject_id: Some(7),
            difficulty: "easy".into(),
            created_at: chrono::Utc::now(),
        };
        assert!(QuestionFilter::default().matches(&q));
        let filter = QuestionFilter {
            category: Some(2),
            subject: None,
            difficulty: Some("easy".into()),
        };
        assert!(filter.matches(&q));
        let filter = QuestionFilter {
            category: Some(3),
            ..Default::default()
        };
        assert!(!filter.matches(&q));
    }
}
