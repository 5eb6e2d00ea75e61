use std::fmt::{self, Display};

use chrono::{DateTime, Datelike, TimeDelta, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::{canvas::Assignment, config::Config};

/// Grace period and window length, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    /// Time after the due date before grading opens.
    grace:  TimeDelta,
    /// How long grading stays open.
    length: TimeDelta,
}

impl WindowSpec {
    /// Creates a window from day counts.
    pub fn from_days(grace_days: u32, window_days: u32) -> Self {
        Self {
            grace:  TimeDelta::days(i64::from(grace_days)),
            length: TimeDelta::days(i64::from(window_days)),
        }
    }

    /// Creates the window a configuration describes.
    pub fn from_config(config: &Config) -> Self {
        Self::from_days(config.grace_days(), config.window_days())
    }

    /// When an assignment due at `due_at` becomes gradable.
    pub fn opens_at(&self, due_at: DateTime<Utc>) -> DateTime<Utc> {
        due_at + self.grace
    }

    /// The last instant an assignment due at `due_at` is gradable.
    pub fn closes_at(&self, due_at: DateTime<Utc>) -> DateTime<Utc> {
        self.opens_at(due_at) + self.length
    }

    /// `now` lies in `[due_at + grace, due_at + grace + length]`.
    pub fn is_gradable(&self, due_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now >= self.opens_at(due_at) && now <= self.closes_at(due_at)
    }

    /// The due dates that are gradable at `now`.
    pub fn due_range(&self, now: DateTime<Utc>) -> GradingWindow {
        GradingWindow {
            start: now - self.grace - self.length,
            end:   now - self.grace,
        }
    }
}

/// Whether an assignment may be graded at `now`. Undated assignments never
/// are.
pub fn is_gradable(assignment: &Assignment, now: DateTime<Utc>, spec: &WindowSpec) -> bool {
    assignment
        .due_at
        .is_some_and(|due_at| spec.is_gradable(due_at, now))
}

/// A closed interval of due dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingWindow {
    /// Earliest due date still gradable.
    pub start: DateTime<Utc>,
    /// Latest due date already past its grace period.
    pub end:   DateTime<Utc>,
}

impl GradingWindow {
    /// Formats the bounds in a local time zone, for logs.
    pub fn in_zone(&self, tz: Tz) -> LocalWindow {
        LocalWindow {
            start: self.start.with_timezone(&tz),
            end:   self.end.with_timezone(&tz),
        }
    }
}

/// A [`GradingWindow`] expressed in a local zone.
#[derive(Debug, Clone, Copy)]
pub struct LocalWindow {
    /// Lower bound.
    pub start: DateTime<Tz>,
    /// Upper bound.
    pub end:   DateTime<Tz>,
}

impl Display for LocalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} , {}]", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}

/// With the weekly gate on, a run only acts at Thursday 17:00 (minute 0)
/// local time.
pub fn should_run_now(enforce_thursday_5pm: bool, now: DateTime<Utc>, tz: Tz) -> bool {
    if !enforce_thursday_5pm {
        return true;
    }
    let local = now.with_timezone(&tz);
    local.weekday() == Weekday::Thu && local.hour() == 17 && local.minute() == 0
}
