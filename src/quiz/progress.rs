//! Per-category running statistics updated after each graded answer.

use chrono::{DateTime, Utc};

use crate::models::stats::{NewUserStats, UserStats};

/// Folds one graded answer into the previous stats row for its category.
pub fn record_answer(
    previous: Option<&UserStats>,
    user_id: i64,
    category_id: i64,
    correct: bool,
    time_spent: i32,
    now: DateTime<Utc>,
) -> NewUserStats {
    let time_spent = i64::from(time_spent.max(0));
    let prev_total = previous.map_or(0, |s| s.total_answers);
    let prev_correct = previous.map_or(0, |s| s.correct_answers);
    let prev_avg = previous.and_then(|s| s.avg_time_per_question);
    let prev_streak = previous.map_or(0, |s| s.streak);

    let total_answers = prev_total.saturating_add(1);
    let elapsed_before = i64::from(prev_avg.unwrap_or(0)) * i64::from(prev_total);
    let total = i64::from(total_answers);
    let avg = (elapsed_before + time_spent + total / 2) / total;

    NewUserStats {
        user_id,
        category_id,
        total_answers,
        correct_answers: prev_correct + i32::from(correct),
        avg_time_per_question: Some(i32::try_from(avg).unwrap_or(i32::MAX)),
        last_attempt: now,
        streak: if correct { prev_streak.saturating_add(1) } else { 0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(total: i32, correct: i32, avg: Option<i32>, streak: i32) -> UserStats {
        UserStats {
            id: 1,
            user_id: 7,
            category_id: 3,
            total_answers: total,
            correct_answers: correct,
            avg_time_per_question: avg,
            last_attempt: None,
            streak,
        }
    }

    #[test]
    fn first_answer_starts_the_row() {
        let now = Utc::now();
        let next = record_answer(None, 7, 3, true, 12, now);
        assert_eq!(next.total_answers, 1);
        assert_eq!(next.correct_answers, 1);
        assert_eq!(next.avg_time_per_question, Some(12));
        assert_eq!(next.streak, 1);
        assert_eq!(next.last_attempt, now);
    }

    #[test]
    fn running_average_and_streak() {
        let prev = stats(3, 2, Some(10), 2);
        let next = record_answer(Some(&prev), 7, 3, true, 14, Utc::now());
        assert_eq!(next.total_answers, 4);
        assert_eq!(next.correct_answers, 3);
        // (30 + 14) / 4 = 11
        assert_eq!(next.avg_time_per_question, Some(11));
        assert_eq!(next.streak, 3);
    }

    #[test]
    fn wrong_answer_breaks_streak() {
        let prev = stats(5, 5, Some(4), 5);
        let next = record_answer(Some(&prev), 7, 3, false, -3, Utc::now());
        assert_eq!(next.streak, 0);
        assert_eq!(next.correct_answers, 5);
        // (20 + 0) / 6 = 3.33
        assert_eq!(next.avg_time_per_question, Some(3));
    }
}
