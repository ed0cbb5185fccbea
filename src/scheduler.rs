//! SM-2 derived review scheduling.
//!
//! Quality anchors are Hard = 1, Normal = 3, Easy = 5. After each review:
//!
//! - a failed recall (quality < 3) resets `repetitions` to 0 and the interval to 1 day
//! - a successful recall increments `repetitions`; the interval becomes 1 day, then
//!   3 days, then `round(interval * ease)` using the ease from before this review
//! - ease moves by `0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)` and never drops below 1.3
//!
//! The scheduler is pure: it takes the review time as an argument and returns the
//! updated card without touching storage.

use chrono::{DateTime, Duration, Utc};

use crate::config::SchedulerConfig;
use crate::errors::Result;
use crate::models::{Card, Grade, MIN_EASE_FACTOR};

/// Upper bound on any produced interval (100 years).
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

const FIRST_SUCCESS_INTERVAL: u32 = 1;
const SECOND_SUCCESS_INTERVAL: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewLog {
    pub grade: Grade,
    pub quality: i32,
    pub previous_interval_days: u32,
    pub scheduled_days: u32,
    pub ease_before: f64,
    pub ease_after: f64,
    pub reviewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Sm2Scheduler {
    min_ease: f64,
    max_ease: Option<f64>,
}

impl Default for Sm2Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Sm2Scheduler {
    pub fn new() -> Self {
        Self {
            min_ease: MIN_EASE_FACTOR,
            max_ease: None,
        }
    }

    /// The floor can be raised but never set below 1.3.
    pub fn with_ease_bounds(min_ease: f64, max_ease: Option<f64>) -> Self {
        let min_ease = min_ease.max(MIN_EASE_FACTOR);
        Self {
            min_ease,
            max_ease: max_ease.map(|max| max.max(min_ease)),
        }
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::with_ease_bounds(config.min_ease, config.max_ease)
    }

    pub fn min_ease(&self) -> f64 {
        self.min_ease
    }

    pub fn max_ease(&self) -> Option<f64> {
        self.max_ease
    }

    /// Schedule a card from a raw quality value, rejecting anything outside {1, 3, 5}.
    pub fn schedule_quality(
        &self,
        card: &Card,
        quality: i32,
        now: DateTime<Utc>,
    ) -> Result<(Card, ReviewLog)> {
        let grade = Grade::from_quality(quality)?;
        Ok(self.schedule_card(card, grade, now))
    }

    pub fn schedule_card(&self, card: &Card, grade: Grade, now: DateTime<Utc>) -> (Card, ReviewLog) {
        let quality = grade.quality();
        let ease_before = card.ease_factor.max(self.min_ease);

        let (repetitions, interval_days) = if grade.is_success() {
            let repetitions = card.repetitions.saturating_add(1);
            let interval = match repetitions {
                1 => FIRST_SUCCESS_INTERVAL,
                2 => SECOND_SUCCESS_INTERVAL,
                _ => self.grow_interval(card.interval_days, ease_before),
            };
            (repetitions, interval)
        } else {
            (0, FIRST_SUCCESS_INTERVAL)
        };

        let ease_after = self.adjust_ease(ease_before, quality);
        let next_review_at = now + Duration::days(i64::from(interval_days));

        let updated = Card {
            ease_factor: ease_after,
            interval_days,
            repetitions,
            last_reviewed_at: Some(now),
            next_review_at: Some(next_review_at),
            last_grade: Some(grade),
            ..card.clone()
        };

        let log = ReviewLog {
            grade,
            quality,
            previous_interval_days: card.interval_days,
            scheduled_days: interval_days,
            ease_before,
            ease_after,
            reviewed_at: now,
        };

        (updated, log)
    }

    fn grow_interval(&self, interval_days: u32, ease: f64) -> u32 {
        let grown = round_half_up(f64::from(interval_days.max(1)) * ease);
        // `as` saturates on overflow
        (grown as u32).clamp(1, MAX_INTERVAL_DAYS)
    }

    fn adjust_ease(&self, ease: f64, quality: i32) -> f64 {
        let miss = f64::from(5 - quality);
        let adjusted = ease + (0.1 - miss * (0.08 + miss * 0.02));
        let floored = adjusted.max(self.min_ease);
        match self.max_ease {
            Some(max) => floored.min(max),
            None => floored,
        }
    }
}

/// Round to the nearest integer with halves going up. Only used on positive values.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
