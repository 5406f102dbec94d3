//! Leitner box scheduling for Cardbox
//!
//! This crate provides the spaced repetition rules behind card trainings: which box a
//! submitted answer lands in, when the card becomes due again, and where "today" ends.
//! Everything here is pure: callers pass the current time in.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest box a card can live in.
pub const MIN_BOX: i32 = 1;

/// Highest box any training can be configured with.
pub const MAX_BOX: i32 = 13;

/// Errors raised by box and policy validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrsError {
    #[error("box must be an integer between 1 and 13, got {0}")]
    InvalidBox(i32),
    #[error("box amount must be an integer between 1 and 13, got {0}")]
    InvalidBoxAmount(i32),
    #[error("unknown backtrack policy: {0}")]
    UnknownBacktrack(String),
}

/// What happens to a card whose submitted box exceeds the training's box amount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Backtrack {
    /// Return the card to the box it was in before the failed attempt.
    BacktrackPrior,
    /// Send the card back to the first box.
    #[default]
    BacktrackFirst,
}

impl Backtrack {
    /// Wire and storage representation of the policy.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BacktrackPrior => "BACKTRACK_PRIOR",
            Self::BacktrackFirst => "BACKTRACK_FIRST",
        }
    }
}

impl fmt::Display for Backtrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backtrack {
    type Err = SrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BACKTRACK_PRIOR" => Ok(Self::BacktrackPrior),
            "BACKTRACK_FIRST" => Ok(Self::BacktrackFirst),
            other => Err(SrsError::UnknownBacktrack(other.to_string())),
        }
    }
}

impl TryFrom<String> for Backtrack {
    type Error = SrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Check that a submitted box is within `[MIN_BOX, MAX_BOX]`.
///
/// The check is independent of any training's box amount: a client may ask for a box
/// above its training's maximum (that is how a failure at the top box is reported), but
/// never above the global maximum.
pub fn validate_box(box_number: i32) -> Result<i32, SrsError> {
    if box_number < MIN_BOX || box_number > MAX_BOX {
        return Err(SrsError::InvalidBox(box_number));
    }
    Ok(box_number)
}

/// Check that a training's box amount is within `[MIN_BOX, MAX_BOX]`.
pub fn validate_box_amount(box_amount: i32) -> Result<i32, SrsError> {
    if box_amount < MIN_BOX || box_amount > MAX_BOX {
        return Err(SrsError::InvalidBoxAmount(box_amount));
    }
    Ok(box_amount)
}

/// Result of classifying a submitted box against a training's box amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxOutcome {
    /// The card moves to this box.
    Advance(i32),
    /// The card failed at the top box; the backtrack policy decides where it goes.
    Backtrack,
}

impl BoxOutcome {
    /// Classify a submitted target box.
    ///
    /// # Errors
    ///
    /// Returns [`SrsError`] when either the box or the box amount is out of range.
    pub fn classify(submitted: i32, box_amount: i32) -> Result<Self, SrsError> {
        validate_box(submitted)?;
        validate_box_amount(box_amount)?;

        if submitted > box_amount {
            Ok(Self::Backtrack)
        } else {
            Ok(Self::Advance(submitted))
        }
    }

    /// Turn the outcome into a concrete box in `[MIN_BOX, box_amount]`.
    ///
    /// `prior_box` is the card's persisted box before this submission.
    pub fn resolve(self, policy: Backtrack, prior_box: i32, box_amount: i32) -> i32 {
        match (self, policy) {
            (Self::Advance(box_number), _) => box_number,
            (Self::Backtrack, Backtrack::BacktrackFirst) => MIN_BOX,
            (Self::Backtrack, Backtrack::BacktrackPrior) => {
                prior_box.clamp(MIN_BOX, box_amount.max(MIN_BOX))
            }
        }
    }
}

/// Classify and resolve a submitted box in one step.
///
/// # Errors
///
/// Returns [`SrsError`] when the submitted box or the box amount is out of range.
pub fn resolve_box(
    submitted: i32,
    box_amount: i32,
    policy: Backtrack,
    prior_box: i32,
) -> Result<i32, SrsError> {
    Ok(BoxOutcome::classify(submitted, box_amount)?.resolve(policy, prior_box, box_amount))
}

/// Review interval, in whole days, for a card that just moved into `box_number`.
///
/// The intervals follow `1, 2, 3, 5, 8, 13, 21, ...`: box 1 waits one day, box 2 two
/// days, and every further box waits the sum of the two previous intervals. Boxes below
/// [`MIN_BOX`] are treated as box 1.
pub fn interval_days(box_number: i32) -> i64 {
    let (mut current, mut next) = (1_i64, 2_i64);
    for _ in MIN_BOX..box_number {
        let sum = current + next;
        current = next;
        next = sum;
    }
    current
}

/// Next review date for a card that just moved into `box_number`.
///
/// Days are a fixed 24 hours: the result is `now + interval_days * 86_400_000 ms`,
/// regardless of daylight-saving shifts.
pub fn next_review_date(box_number: i32, now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::days(interval_days(box_number))
}

/// Last millisecond of `now`'s calendar day in `tz` (23:59:59.999 local).
///
/// Computed as the start of the following local day minus one millisecond, which is
/// local midnight plus 24 hours minus one millisecond on days without a DST change.
pub fn end_of_day<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let today = now.with_timezone(tz).date_naive();
    let next_start = match today.succ_opt() {
        Some(tomorrow) => start_of_day(tomorrow, tz),
        None => start_of_day(today, tz) + Duration::days(1),
    };

    (next_start - Duration::milliseconds(1)).with_timezone(&Utc)
}

/// First valid local instant of `date`: midnight, or the end of a DST gap covering it.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::default());

    (0..=DAY_IN_QUARTER_HOURS)
        .map(|step| midnight + Duration::minutes(15 * step))
        .find_map(|local| tz.from_local_datetime(&local).earliest())
        // Only a zone without a single valid time that day gets here
        .unwrap_or_else(|| tz.from_utc_datetime(&midnight))
}

const DAY_IN_QUARTER_HOURS: i64 = 96;

/// Running statistics for a deck training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatistics {
    /// Number of completed study sessions.
    pub attempts: i32,
    /// Rounded mean of the completion time of all sessions, in seconds.
    pub avg_completion_time_seconds: i32,
}

impl SessionStatistics {
    /// Fold one more session into the statistics.
    ///
    /// Negative inputs are treated as zero so both fields stay non-negative.
    pub fn record(self, completion_time_seconds: i32) -> Self {
        let attempts = f64::from(self.attempts.max(0));
        let total = f64::from(self.avg_completion_time_seconds.max(0))
            .mul_add(attempts, f64::from(completion_time_seconds.max(0)));

        Self {
            attempts: self.attempts.max(0) + 1,
            avg_completion_time_seconds: (total / (attempts + 1.0)).round() as i32,
        }
    }
}
