#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// HTTP client for the Canvas REST API.
pub mod client;
/// Errors surfaced by the client.
pub mod error;
/// `Link` header pagination.
pub mod link;
/// Assignment and submission payloads.
pub mod types;

use std::future::Future;

pub use client::{CanvasClient, RetryPolicy};
pub use error::CanvasError;
pub use types::{Assignment, GradingType, Submission, SubmissionType, User};

/// The slice of a gradebook that a grading run reads from and writes to.
///
/// [`CanvasClient`] is the production implementation; tests drive the run
/// loop with an in-memory gradebook.
pub trait Gradebook {
    /// Lists every assignment in the course.
    fn list_assignments(
        &self,
        course_id: &str,
    ) -> impl Future<Output = Result<Vec<Assignment>, CanvasError>> + Send;

    /// Lists every submission (one per enrolled student) for an assignment.
    fn list_submissions(
        &self,
        course_id: &str,
        assignment_id: u64,
    ) -> impl Future<Output = Result<Vec<Submission>, CanvasError>> + Send;

    /// Sets the posted grade of one student's submission.
    fn update_grade(
        &self,
        course_id: &str,
        assignment_id: u64,
        user_id: u64,
        posted_grade: &str,
    ) -> impl Future<Output = Result<(), CanvasError>> + Send;
}
