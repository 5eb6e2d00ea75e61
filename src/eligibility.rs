use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use itertools::Itertools;

use crate::{
    canvas::{Assignment, GradingType},
    config::Config,
    window::{WindowSpec, is_gradable},
};

/// Why an assignment is left alone by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No due date, so no window.
    NoDueDate,
    /// Belongs to a different assignment group than the one configured.
    OtherGroup,
    /// Not a `complete_incomplete` assignment while those are required.
    NotCompleteIncomplete(GradingType),
    /// Students are not expected to submit anything digitally.
    NoDigitalSubmission,
    /// Grace period not over yet.
    TooEarly {
        /// When grading opens
        opens_at: DateTime<Utc>,
    },
    /// Window already closed.
    TooLate {
        /// When grading closed
        closed_at: DateTime<Utc>,
    },
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoDueDate => write!(f, "no due date"),
            SkipReason::OtherGroup => write!(f, "different assignment group"),
            SkipReason::NotCompleteIncomplete(kind) => {
                write!(f, "grading type is {kind}, not complete_incomplete")
            }
            SkipReason::NoDigitalSubmission => write!(f, "no digital submission expected"),
            SkipReason::TooEarly { opens_at } => {
                write!(f, "grace period runs until {}", opens_at.to_rfc3339())
            }
            SkipReason::TooLate { closed_at } => {
                write!(f, "window closed at {}", closed_at.to_rfc3339())
            }
        }
    }
}

/// Whether an assignment expects students to hand something in through
/// Canvas.
///
/// Assignments whose submission types are all non-submission types (`none`,
/// `on_paper`, `not_graded`), or that are not graded at all, need human
/// judgment and are never auto-graded.
pub fn is_eligible(assignment: &Assignment) -> bool {
    if assignment.grading_type == GradingType::NotGraded {
        return false;
    }
    !assignment.submission_types.is_empty()
        && !assignment
            .submission_types
            .iter()
            .all(|kind| kind.is_non_submission())
}

/// The full set of checks an assignment must pass before a run grades it.
#[derive(Debug, Clone)]
pub struct AssignmentFilter {
    /// Required assignment group, if any.
    group:                       Option<String>,
    /// Only accept `complete_incomplete` assignments.
    require_complete_incomplete: bool,
    /// Grace period and window length.
    window:                      WindowSpec,
}

impl AssignmentFilter {
    /// Creates a filter.
    pub fn new(group: Option<String>, require_complete_incomplete: bool, window: WindowSpec) -> Self {
        Self {
            group,
            require_complete_incomplete,
            window,
        }
    }

    /// Creates the filter a configuration describes.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.assignment_group_id().map(str::to_owned),
            config.require_complete_incomplete(),
            WindowSpec::from_config(config),
        )
    }

    /// Checks one assignment, returning the first reason to skip it.
    pub fn check(&self, assignment: &Assignment, now: DateTime<Utc>) -> Result<(), SkipReason> {
        let Some(due_at) = assignment.due_at else {
            return Err(SkipReason::NoDueDate);
        };

        if let Some(group) = &self.group {
            let matches = assignment
                .assignment_group_id
                .is_some_and(|id| id.to_string() == group.trim());
            if !matches {
                return Err(SkipReason::OtherGroup);
            }
        }

        if self.require_complete_incomplete
            && assignment.grading_type != GradingType::CompleteIncomplete
        {
            return Err(SkipReason::NotCompleteIncomplete(assignment.grading_type.clone()));
        }

        if !is_eligible(assignment) {
            return Err(SkipReason::NoDigitalSubmission);
        }

        if !is_gradable(assignment, now, &self.window) {
            let opens_at = self.window.opens_at(due_at);
            return Err(if now < opens_at {
                SkipReason::TooEarly { opens_at }
            } else {
                SkipReason::TooLate {
                    closed_at: self.window.closes_at(due_at),
                }
            });
        }

        Ok(())
    }

    /// Returns the assignments to grade, earliest due date first.
    pub fn select<'a>(&self, assignments: &'a [Assignment], now: DateTime<Utc>) -> Vec<&'a Assignment> {
        assignments
            .iter()
            .filter(|a| self.check(a, now).is_ok())
            .sorted_by_key(|a| a.due_at)
            .collect()
    }
}
