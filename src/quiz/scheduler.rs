//! Spaced-repetition scheduling.
//!
//! The default policy is a fixed interval ladder keyed on the number of
//! consecutive correct answers, a simplification of SuperMemo 2. The `Sm2`
//! policy implements the full algorithm and is the only consumer of the
//! stored ease factor.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};

use crate::{
    config::{DEFAULT_EASE_FACTOR, MIN_EASE_FACTOR},
    models::review::ReviewSchedule,
};

/// Days until the next review after a correct answer, indexed by the number
/// of consecutive correct answers before it. The last entry applies beyond.
pub const INTERVAL_LADDER: [i64; 6] = [1, 3, 7, 14, 30, 60];

/// Days to add after a wrong answer.
pub const RETRY_INTERVAL: i64 = 1;

/// Upper bound on any scheduled interval (about a century).
pub const MAX_INTERVAL_DAYS: i32 = 36_500;

/// Interval in days selected by the ladder.
pub fn ladder_days(is_correct: bool, consecutive_correct: i32) -> i64 {
    if !is_correct {
        return RETRY_INTERVAL;
    }
    let step = usize::try_from(consecutive_correct.max(0)).unwrap_or(usize::MAX);
    INTERVAL_LADDER[step.min(INTERVAL_LADDER.len() - 1)]
}

/// Next review date for an answer, anchored at `anchor`.
///
/// A wrong answer always schedules the next day. Streak bookkeeping belongs
/// to the caller; this function only reads the count.
pub fn next_review_date(
    is_correct: bool,
    consecutive_correct: i32,
    anchor: DateTime<Utc>,
) -> DateTime<Utc> {
    anchor + Duration::days(ladder_days(is_correct, consecutive_correct))
}

/// New review state computed for one graded answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewUpdate {
    pub next_review: DateTime<Utc>,
    pub interval_days: i32,
    pub ease_factor: i32,
    pub consecutive: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReviewPolicy {
    #[default]
    Ladder,
    Sm2,
}

impl ReviewPolicy {
    /// Computes the next schedule from the previous row (if any).
    pub fn schedule(
        &self,
        previous: Option<&ReviewSchedule>,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> ReviewUpdate {
        let consecutive = previous.map_or(0, |p| p.consecutive);
        let ease_factor = previous.map_or(DEFAULT_EASE_FACTOR, |p| p.ease_factor);
        let next_consecutive = if is_correct { consecutive.saturating_add(1) } else { 0 };

        match self {
            ReviewPolicy::Ladder => {
                let days = ladder_days(is_correct, consecutive);
                ReviewUpdate {
                    next_review: next_review_date(is_correct, consecutive, now),
                    interval_days: days as i32,
                    ease_factor,
                    consecutive: next_consecutive,
                }
            }
            ReviewPolicy::Sm2 => {
                let previous_interval = previous.map_or(0, |p| p.interval_days);
                let ease_factor = sm2_ease(ease_factor, is_correct);
                let days = if !is_correct {
                    RETRY_INTERVAL as i32
                } else {
                    match consecutive {
                        0 => 1,
                        1 => 6,
                        _ => {
                            let grown = f64::from(previous_interval.max(1))
                                * f64::from(ease_factor)
                                / 100.0;
                            grown.round().min(f64::from(MAX_INTERVAL_DAYS)) as i32
                        }
                    }
                };
                let days = days.clamp(1, MAX_INTERVAL_DAYS);
                ReviewUpdate {
                    next_review: add_days(now, days),
                    interval_days: days,
                    ease_factor,
                    consecutive: next_consecutive,
                }
            }
        }
    }
}

/// `now + days`, saturating at the latest representable instant.
fn add_days(now: DateTime<Utc>, days: i32) -> DateTime<Utc> {
    now.checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// SM-2 ease update with binary quality: 5 when correct, 2 when wrong.
/// `EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))`, in hundredths.
fn sm2_ease(ease_factor: i32, is_correct: bool) -> i32 {
    let quality = if is_correct { 5 } else { 2 };
    let miss = 5 - quality;
    // 100 * (0.1 - miss * (0.08 + miss * 0.02)) == 10 - miss * (8 + 2 * miss)
    let delta = 10 - miss * (8 + 2 * miss);
    (ease_factor + delta).max(MIN_EASE_FACTOR)
}

impl fmt::Display for ReviewPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewPolicy::Ladder => write!(f, "ladder"),
            ReviewPolicy::Sm2 => write!(f, "sm2"),
        }
    }
}

impl FromStr for ReviewPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ladder" => Ok(ReviewPolicy::Ladder),
            "sm2" | "sm-2" => Ok(ReviewPolicy::Sm2),
            other => Err(format!("unknown review policy '{}'", other)),
        }
    }
}
