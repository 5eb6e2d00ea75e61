use std::fmt::{self, Display};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// How Canvas displays and stores grades for an assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradingType {
    /// Pass/fail, stored as `complete`/`incomplete`.
    PassFail,
    /// Percentage of points possible.
    Percent,
    /// Letter grade from a grading scheme.
    LetterGrade,
    /// GPA scale grade.
    GpaScale,
    /// Raw points.
    #[default]
    Points,
    /// Complete/Incomplete.
    CompleteIncomplete,
    /// Not graded at all.
    NotGraded,
    /// Anything this crate does not know about.
    #[serde(untagged)]
    Other(String),
}

impl GradingType {
    /// The identifier Canvas uses for this grading type.
    pub fn as_str(&self) -> &str {
        match self {
            GradingType::PassFail => "pass_fail",
            GradingType::Percent => "percent",
            GradingType::LetterGrade => "letter_grade",
            GradingType::GpaScale => "gpa_scale",
            GradingType::Points => "points",
            GradingType::CompleteIncomplete => "complete_incomplete",
            GradingType::NotGraded => "not_graded",
            GradingType::Other(other) => other,
        }
    }

    /// Whether grades are posted as `complete`/`incomplete` rather than
    /// points.
    pub fn uses_completion_labels(&self) -> bool {
        matches!(self, GradingType::CompleteIncomplete | GradingType::PassFail)
    }
}

impl Display for GradingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A way students can hand in an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    /// Text typed into the Canvas editor.
    OnlineTextEntry,
    /// A URL.
    OnlineUrl,
    /// An uploaded file.
    OnlineUpload,
    /// Audio or video recording.
    MediaRecording,
    /// A classic quiz.
    OnlineQuiz,
    /// A graded discussion.
    DiscussionTopic,
    /// An LTI tool.
    ExternalTool,
    /// Annotated document.
    StudentAnnotation,
    /// A wiki page.
    WikiPage,
    /// No submission expected.
    None,
    /// Handed in on paper.
    OnPaper,
    /// Not graded.
    NotGraded,
    /// Anything this crate does not know about.
    #[serde(untagged)]
    Other(String),
}

impl SubmissionType {
    /// Types for which Canvas never records a `submitted_at`.
    pub fn is_non_submission(&self) -> bool {
        matches!(self, SubmissionType::None | SubmissionType::OnPaper | SubmissionType::NotGraded)
    }
}

/// An assignment as returned by `GET /courses/:id/assignments`.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
#[builder(doc)]
pub struct Assignment {
    /// Assignment id.
    pub id:                  u64,
    /// Display name.
    #[serde(default)]
    #[builder(default)]
    pub name:                String,
    /// Due date, if the assignment has one.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub due_at:              Option<DateTime<Utc>>,
    /// Assignment group the assignment belongs to.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub assignment_group_id: Option<u64>,
    /// How grades are displayed.
    #[serde(default)]
    #[builder(default)]
    pub grading_type:        GradingType,
    /// Maximum points.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub points_possible:     Option<f64>,
    /// Accepted submission types.
    #[serde(default)]
    #[builder(default)]
    pub submission_types:    Vec<SubmissionType>,
}

impl Assignment {
    /// Name for log lines, falling back to the id when Canvas sends none.
    pub fn label(&self) -> String {
        if self.name.trim().is_empty() {
            format!("(assignment {})", self.id)
        } else {
            self.name.clone()
        }
    }
}

/// The student a submission belongs to, present with `include[]=user`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id:            u64,
    /// Display name.
    #[serde(default)]
    pub name:          Option<String>,
    /// Name in `Last, First` form.
    #[serde(default)]
    pub sortable_name: Option<String>,
}

/// A student's submission slot for one assignment.
///
/// Canvas returns one per enrolled student whether or not they handed
/// anything in; `submitted_at` is only set once they did.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[builder(doc)]
pub struct Submission {
    /// Student id.
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub user_id:        Option<u64>,
    /// When the student last submitted.
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub submitted_at:   Option<DateTime<Utc>>,
    /// Current grade as displayed (`complete`, `8`, `B+`...).
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub grade:          Option<String>,
    /// Posted grade, when Canvas includes it.
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub posted_grade:   Option<String>,
    /// Current score in points.
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub score:          Option<f64>,
    /// Whether the student is excused from the assignment.
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub excused:        Option<bool>,
    /// `unsubmitted`, `submitted`, `graded`, `pending_review`.
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub workflow_state: Option<String>,
    /// Student details.
    #[serde(default)]
    #[builder(setter(strip_option))]
    pub user:           Option<User>,
}

impl Submission {
    /// Name of the student if Canvas included it, else their id.
    pub fn student(&self) -> String {
        match (&self.user, self.user_id) {
            (Some(User { name: Some(name), .. }), _) => name.clone(),
            (_, Some(id)) => format!("user {id}"),
            (_, None) => "unknown user".to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_canvas_assignment() {
        let json = r#"{
            "id": 42,
            "name": "Reading reflection 3",
            "due_at": "2024-02-09T06:59:59Z",
            "assignment_group_id": 7,
            "grading_type": "complete_incomplete",
            "points_possible": 1.0,
            "submission_types": ["online_text_entry", "online_upload"],
            "published": true,
            "html_url": "https://canvas.test/courses/1/assignments/42"
        }"#;
        let a: Assignment = serde_json::from_str(json).expect("assignment");

        assert_eq!(a.id, 42);
        assert_eq!(a.grading_type, GradingType::CompleteIncomplete);
        assert_eq!(a.assignment_group_id, Some(7));
        assert_eq!(a.submission_types, vec![
            SubmissionType::OnlineTextEntry,
            SubmissionType::OnlineUpload
        ]);
        assert_eq!(a.due_at.map(|d| d.to_rfc3339()), Some("2024-02-09T06:59:59+00:00".into()));
    }

    #[test]
    fn unknown_enum_values_are_preserved() {
        let json = r#"{"id": 1, "due_at": null, "grading_type": "stars", "submission_types": ["carrier_pigeon"]}"#;
        let a: Assignment = serde_json::from_str(json).expect("assignment");

        assert_eq!(a.grading_type, GradingType::Other("stars".into()));
        assert_eq!(a.grading_type.to_string(), "stars");
        assert_eq!(a.submission_types, vec![SubmissionType::Other("carrier_pigeon".into())]);
        assert!(a.due_at.is_none());
        assert_eq!(a.label(), "(assignment 1)");
    }

    #[test]
    fn decodes_an_unsubmitted_submission() {
        let json = r#"{
            "user_id": 9,
            "submitted_at": null,
            "grade": null,
            "score": null,
            "excused": null,
            "workflow_state": "unsubmitted",
            "user": {"id": 9, "name": "Ada Lovelace", "sortable_name": "Lovelace, Ada"}
        }"#;
        let s: Submission = serde_json::from_str(json).expect("submission");

        assert_eq!(s.user_id, Some(9));
        assert!(s.submitted_at.is_none());
        assert_eq!(s.student(), "Ada Lovelace");
        assert_eq!(s.workflow_state.as_deref(), Some("unsubmitted"));
    }
}
