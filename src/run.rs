#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use itertools::Itertools;
use tracing::{debug, error, info};
use typed_builder::TypedBuilder;

use crate::{
    canvas::{Assignment, Gradebook},
    config::Config,
    decision::{self, Decision},
    eligibility::AssignmentFilter,
    report::{AssignmentReport, AssignmentRow, RunSummary},
    window::WindowSpec,
};

/// Formats an optional due date in the configured zone.
pub fn format_due(due_at: Option<DateTime<Utc>>, tz: Tz) -> String {
    match due_at {
        Some(due_at) => due_at
            .with_timezone(&tz)
            .format("%a %Y-%m-%d %H:%M %Z")
            .to_string(),
        None => "-".to_owned(),
    }
}

/// One completion-grading pass over a course.
#[derive(TypedBuilder)]
#[builder(doc)]
pub struct CompletionGrader<'a, G: Gradebook> {
    /// Where assignments and submissions come from and grades go to.
    gradebook: &'a G,
    /// Run configuration.
    config:    &'a Config,
    /// Instant the window is measured from.
    now:       DateTime<Utc>,
}

impl<G: Gradebook> CompletionGrader<'_, G> {
    /// Grades every eligible assignment and returns what happened.
    ///
    /// Failing to list assignments aborts the run. Failing to list one
    /// assignment's submissions, or to write one grade, is counted and the
    /// run carries on.
    pub async fn run(&self) -> Result<RunSummary> {
        let config = self.config;
        let window = WindowSpec::from_config(config).due_range(self.now);
        info!(
            "Due-date grading window (local {}): {}",
            config.timezone(),
            window.in_zone(config.timezone())
        );
        info!(
            "DRY_RUN={} | COURSE_ID={} | ASSIGNMENT_GROUP_ID={}",
            config.dry_run(),
            config.course_id(),
            config.assignment_group_id().unwrap_or("None")
        );

        let assignments = self
            .gradebook
            .list_assignments(config.course_id())
            .await
            .with_context(|| {
                format!("Could not list assignments for course {}", config.course_id())
            })?;
        info!("Fetched {} assignments from course.", assignments.len());

        let eligible = AssignmentFilter::from_config(config).select(&assignments, self.now);
        info!("Eligible assignments in window: {}", eligible.len());

        let mut summary = RunSummary::new(config.dry_run());
        for assignment in eligible {
            summary.assignments.push(self.grade_assignment(assignment).await);
        }

        info!("----- Summary -----");
        info!("Assignments processed: {}", summary.assignments.len());
        info!(
            "Total updates: {}{}",
            summary.total_updates(),
            if config.dry_run() { " (DRY_RUN)" } else { "" }
        );
        info!("Total unchanged skips: {}", summary.total_unchanged());
        info!("Total errors: {}", summary.total_errors());

        Ok(summary)
    }

    /// Grades every submission of one assignment.
    async fn grade_assignment(&self, assignment: &Assignment) -> AssignmentReport {
        let config = self.config;
        let course_id = config.course_id();
        let mut report = AssignmentReport {
            id: assignment.id,
            name: assignment.label(),
            due: format_due(assignment.due_at, config.timezone()),
            ..AssignmentReport::default()
        };

        info!(
            "Processing assignment {}: {} | due_at={}",
            assignment.id,
            report.name,
            assignment
                .due_at
                .map(|d| d.to_rfc3339())
                .unwrap_or_default()
        );

        let submissions = match self
            .gradebook
            .list_submissions(course_id, assignment.id)
            .await
        {
            Ok(submissions) => submissions,
            Err(e) => {
                report.errors += 1;
                error!(
                    "Failed to fetch submissions for assignment {}: {:#}",
                    assignment.id,
                    anyhow::Error::from(e)
                );
                return report;
            }
        };
        report.submissions = submissions.len();

        for submission in &submissions {
            match decision::evaluate(assignment, submission) {
                Decision::Ignored(reason) => {
                    report.ignored += 1;
                    debug!("Ignoring submission of {}: {reason:?}", submission.student());
                }
                Decision::Unchanged { .. } => report.unchanged += 1,
                Decision::Update { user_id, grade } if config.dry_run() => {
                    report.updates += 1;
                    info!(
                        "[DRY_RUN] Would set user {user_id} ({}) -> {grade} (submitted_at={})",
                        submission.student(),
                        submission
                            .submitted_at
                            .map(|d| d.to_rfc3339())
                            .unwrap_or_else(|| "None".to_owned())
                    );
                }
                Decision::Update { user_id, grade } => {
                    match self
                        .gradebook
                        .update_grade(course_id, assignment.id, user_id, &grade.to_string())
                        .await
                    {
                        Ok(()) => {
                            report.updates += 1;
                            debug!("Set user {user_id} -> {grade}");
                        }
                        Err(e) => {
                            report.errors += 1;
                            error!(
                                "Failed to update grade for assignment {} user {user_id}: {:#}",
                                assignment.id,
                                anyhow::Error::from(e)
                            );
                        }
                    }
                }
            }
        }

        info!(
            "Done assignment {}: updates={}, unchanged_skips={}, submissions={}",
            assignment.id, report.updates, report.unchanged, report.submissions
        );
        report
    }

    /// Lists every assignment in the course with the verdict a run would
    /// reach, earliest due date first and undated ones last.
    pub async fn preview(&self) -> Result<Vec<AssignmentRow>> {
        let config = self.config;
        let assignments = self
            .gradebook
            .list_assignments(config.course_id())
            .await
            .with_context(|| {
                format!("Could not list assignments for course {}", config.course_id())
            })?;
        let filter = AssignmentFilter::from_config(config);

        Ok(assignments
            .iter()
            .sorted_by_key(|a| (a.due_at.is_none(), a.due_at))
            .map(|a| AssignmentRow {
                id:           a.id,
                name:         a.label(),
                due:          format_due(a.due_at, config.timezone()),
                grading_type: a.grading_type.to_string(),
                verdict:      match filter.check(a, self.now) {
                    Ok(()) => "grade".to_owned(),
                    Err(reason) => reason.to_string(),
                },
            })
            .collect())
    }
}
