//! Attempt scoring: pure aggregation over an attempt's answer rows.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{attempt::Answer, question::Question};

/// Aggregate result for a set of answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSummary {
    /// Percentage 0..=100.
    pub score: i32,
    pub correct_count: i32,
    pub total_count: i32,
    pub time_spent_seconds: i64,
}

impl ScoreSummary {
    /// Re-expresses the summary against an attempt's fixed question count,
    /// so questions left unanswered count as incorrect.
    pub fn against_total(self, total_questions: i32) -> Self {
        let total_count = total_questions.max(self.total_count);
        Self {
            score: percentage(self.correct_count, total_count),
            total_count,
            ..self
        }
    }

    pub fn average_time_per_question(&self) -> i64 {
        if self.total_count == 0 {
            return 0;
        }
        let total = i64::from(self.total_count);
        (self.time_spent_seconds + total / 2) / total
    }

    /// Time spent clamped into the column type.
    pub fn time_spent_i32(&self) -> i32 {
        i32::try_from(self.time_spent_seconds).unwrap_or(i32::MAX)
    }
}

/// Score for one category within an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryScore {
    pub category_id: Option<i64>,
    pub correct: i32,
    pub total: i32,
    pub score: i32,
}

/// `round(correct / total * 100)` with half-up rounding; `0` for an empty set.
pub fn percentage(correct: i32, total: i32) -> i32 {
    if total <= 0 {
        return 0;
    }
    let correct = i64::from(correct.clamp(0, total));
    let total = i64::from(total);
    ((200 * correct + total) / (2 * total)) as i32
}

/// Aggregates one attempt's answers. Negative or missing times count as zero.
pub fn score_answers(answers: &[Answer]) -> ScoreSummary {
    let total_count = answers.len() as i32;
    let correct_count = answers.iter().filter(|a| a.correct).count() as i32;
    let time_spent_seconds = answers
        .iter()
        .map(|a| i64::from(a.time_spent.unwrap_or(0).max(0)))
        .sum();

    ScoreSummary {
        score: percentage(correct_count, total_count),
        correct_count,
        total_count,
        time_spent_seconds,
    }
}

/// Per-category scores; answers whose question is unknown are ignored.
pub fn category_breakdown(
    answers: &[Answer],
    questions: &HashMap<i64, Question>,
) -> Vec<CategoryScore> {
    let mut buckets: BTreeMap<Option<i64>, (i32, i32)> = BTreeMap::new();

    for answer in answers {
        let Some(question) = questions.get(&answer.question_id) else {
            continue;
        };
        let entry = buckets.entry(question.category_id).or_default();
        entry.1 += 1;
        if answer.correct {
            entry.0 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(category_id, (correct, total))| CategoryScore {
            category_id,
            correct,
            total,
            score: percentage(correct, total),
        })
        .collect()
}
