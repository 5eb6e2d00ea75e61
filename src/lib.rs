//! # canvas-complete
//!
//! Completion grading for Canvas courses: every student who submitted gets
//! Complete (or full points), everyone else gets Incomplete (or zero), for
//! assignments whose due date sits inside a grading window that opens after
//! a grace period.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Canvas REST client, data model and the `Gradebook` seam
pub mod canvas;
/// Run configuration sourced from the environment and CLI overrides
pub mod config;
/// Maps submission presence to the grade that should be posted
pub mod decision;
/// Decides which assignments a run is allowed to touch
pub mod eligibility;
/// Tables and totals printed after a run
pub mod report;
/// The grading pass itself
pub mod run;
/// Grading window arithmetic and the weekly schedule gate
pub mod window;

pub use canvas::{Assignment, CanvasClient, CanvasError, Gradebook, Submission};
pub use config::{Config, ConfigError, Overrides};
pub use decision::{Decision, PostedGrade};
pub use eligibility::{AssignmentFilter, SkipReason};
pub use report::{AssignmentReport, RunSummary};
pub use window::{GradingWindow, WindowSpec};
