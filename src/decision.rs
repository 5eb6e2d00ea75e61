#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::{self, Display};

use crate::canvas::{Assignment, Submission};

/// Two scores closer than this are the same grade.
const POINTS_EPSILON: f64 = 1e-9;

/// A grade in the form Canvas accepts as `submission[posted_grade]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostedGrade {
    /// `complete`
    Complete,
    /// `incomplete`
    Incomplete,
    /// A point value.
    Points(f64),
}

impl PostedGrade {
    /// Whether this grade is the same as `other`, comparing points loosely.
    pub fn same_as(&self, other: &PostedGrade) -> bool {
        match (self, other) {
            (PostedGrade::Points(a), PostedGrade::Points(b)) => (a - b).abs() < POINTS_EPSILON,
            (a, b) => a == b,
        }
    }
}

impl Display for PostedGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PostedGrade::Complete => f.write_str("complete"),
            PostedGrade::Incomplete => f.write_str("incomplete"),
            PostedGrade::Points(points) if points.fract() == 0.0 => write!(f, "{points:.0}"),
            PostedGrade::Points(points) => write!(f, "{points}"),
        }
    }
}

/// Why a submission was not considered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Canvas sent no `user_id`.
    NoUser,
    /// The student is excused from the assignment.
    Excused,
}

/// What to do with one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Post `grade` for `user_id`.
    Update {
        /// Student to grade
        user_id: u64,
        /// Grade to post
        grade:   PostedGrade,
    },
    /// The gradebook already shows `grade`.
    Unchanged {
        /// Student already graded
        user_id: u64,
        /// Grade currently in the gradebook
        grade:   PostedGrade,
    },
    /// Leave the submission alone.
    Ignored(IgnoreReason),
}

/// Points awarded for a complete submission: `points_possible`, or 1 when
/// the assignment has none.
pub fn full_points(assignment: &Assignment) -> f64 {
    assignment.points_possible.unwrap_or(1.0)
}

/// Submitted means complete (or full points); not submitted means
/// incomplete (or zero). Lateness is not considered.
pub fn grade(assignment: &Assignment, submission: &Submission) -> PostedGrade {
    let submitted = submission.submitted_at.is_some();
    match (assignment.grading_type.uses_completion_labels(), submitted) {
        (true, true) => PostedGrade::Complete,
        (true, false) => PostedGrade::Incomplete,
        (false, true) => PostedGrade::Points(full_points(assignment)),
        (false, false) => PostedGrade::Points(0.0),
    }
}

/// Reads the grade the gradebook currently shows, in the same form
/// [`grade`] produces for this assignment.
pub fn current_grade(assignment: &Assignment, submission: &Submission) -> Option<PostedGrade> {
    if assignment.grading_type.uses_completion_labels() {
        [submission.posted_grade.as_deref(), submission.grade.as_deref()]
            .into_iter()
            .flatten()
            .find_map(completion_label)
    } else {
        submission.score.or_else(|| {
            [submission.posted_grade.as_deref(), submission.grade.as_deref()]
                .into_iter()
                .flatten()
                .find_map(|g| g.trim().parse::<f64>().ok())
        })
        .map(PostedGrade::Points)
    }
}

/// `complete`/`incomplete` in any case and surrounding whitespace.
fn completion_label(value: &str) -> Option<PostedGrade> {
    match value.trim().to_ascii_lowercase().as_str() {
        "complete" => Some(PostedGrade::Complete),
        "incomplete" => Some(PostedGrade::Incomplete),
        _ => None,
    }
}

/// Decides what a run should do with one submission.
pub fn evaluate(assignment: &Assignment, submission: &Submission) -> Decision {
    let Some(user_id) = submission.user_id else {
        return Decision::Ignored(IgnoreReason::NoUser);
    };
    if submission.excused == Some(true) {
        return Decision::Ignored(IgnoreReason::Excused);
    }

    let desired = grade(assignment, submission);
    match current_grade(assignment, submission) {
        Some(current) if current.same_as(&desired) => Decision::Unchanged {
            user_id,
            grade: current,
        },
        _ => Decision::Update {
            user_id,
            grade: desired,
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::canvas::GradingType;

    fn complete_incomplete() -> Assignment {
        Assignment::builder()
            .id(10u64)
            .grading_type(GradingType::CompleteIncomplete)
            .points_possible(1.0)
            .build()
    }

    fn points(possible: Option<f64>) -> Assignment {
        let mut a = Assignment::builder().id(11u64).grading_type(GradingType::Points).build();
        a.points_possible = possible;
        a
    }

    #[test]
    fn submission_presence_decides_completion() {
        let a = complete_incomplete();
        let submitted = Submission::builder().user_id(1u64).submitted_at(Utc::now()).build();
        let missing = Submission::builder().user_id(2u64).build();

        assert_eq!(grade(&a, &submitted), PostedGrade::Complete);
        assert_eq!(grade(&a, &missing), PostedGrade::Incomplete);

        let mut pass_fail = a.clone();
        pass_fail.grading_type = GradingType::PassFail;
        assert_eq!(grade(&pass_fail, &submitted), PostedGrade::Complete);
    }

    #[test]
    fn point_assignments_get_full_points_or_zero() {
        let submitted = Submission::builder().user_id(1u64).submitted_at(Utc::now()).build();
        let missing = Submission::builder().user_id(2u64).build();

        assert_eq!(grade(&points(Some(5.0)), &submitted), PostedGrade::Points(5.0));
        assert_eq!(grade(&points(None), &submitted), PostedGrade::Points(1.0));
        assert_eq!(grade(&points(Some(5.0)), &missing), PostedGrade::Points(0.0));
    }

    #[test]
    fn posted_form_drops_trailing_zero_decimals() {
        assert_eq!(PostedGrade::Complete.to_string(), "complete");
        assert_eq!(PostedGrade::Incomplete.to_string(), "incomplete");
        assert_eq!(PostedGrade::Points(10.0).to_string(), "10");
        assert_eq!(PostedGrade::Points(0.0).to_string(), "0");
        assert_eq!(PostedGrade::Points(2.5).to_string(), "2.5");
    }

    #[test]
    fn matching_grades_are_left_unchanged() {
        let a = complete_incomplete();
        let already = Submission::builder()
            .user_id(1u64)
            .submitted_at(Utc::now())
            .grade(" Complete ")
            .build();
        assert_eq!(evaluate(&a, &already), Decision::Unchanged {
            user_id: 1,
            grade:   PostedGrade::Complete,
        });

        let flipped = Submission::builder().user_id(2u64).grade("complete").build();
        assert_eq!(evaluate(&a, &flipped), Decision::Update {
            user_id: 2,
            grade:   PostedGrade::Incomplete,
        });

        let p = points(Some(3.0));
        let scored = Submission::builder()
            .user_id(3u64)
            .submitted_at(Utc::now())
            .score(3.0)
            .grade("3")
            .build();
        assert!(matches!(evaluate(&p, &scored), Decision::Unchanged { .. }));

        let text_only = Submission::builder().user_id(4u64).grade("0").build();
        assert!(matches!(evaluate(&p, &text_only), Decision::Unchanged { .. }));
    }

    #[test]
    fn ungradeable_submissions_are_ignored() {
        let a = complete_incomplete();
        assert_eq!(
            evaluate(&a, &Submission::builder().build()),
            Decision::Ignored(IgnoreReason::NoUser)
        );
        assert_eq!(
            evaluate(&a, &Submission::builder().user_id(5u64).excused(true).build()),
            Decision::Ignored(IgnoreReason::Excused)
        );
    }
}
