#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

/// Exit status when grades could not all be written.
pub const EXIT_WRITE_ERRORS: u8 = 2;

#[derive(Tabled, Clone, Debug, Default)]
/// Outcome of grading one assignment
pub struct AssignmentReport {
    #[tabled(rename = "Id")]
    /// * `id`: assignment id
    pub id:          u64,
    #[tabled(rename = "Assignment")]
    /// * `name`: assignment name
    pub name:        String,
    #[tabled(rename = "Due")]
    /// * `due`: due date, as shown to the operator
    pub due:         String,
    #[tabled(rename = "Updates")]
    /// * `updates`: grades written (or that would be written in a dry run)
    pub updates:     usize,
    #[tabled(rename = "Unchanged")]
    /// * `unchanged`: submissions already carrying the right grade
    pub unchanged:   usize,
    #[tabled(rename = "Ignored")]
    /// * `ignored`: excused submissions or ones without a student
    pub ignored:     usize,
    #[tabled(rename = "Errors")]
    /// * `errors`: failed fetches or writes
    pub errors:      usize,
    #[tabled(rename = "Submissions")]
    /// * `submissions`: submissions fetched
    pub submissions: usize,
}

/// Totals for a whole run.
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Whether grades were only previewed.
    pub dry_run:     bool,
    /// One entry per eligible assignment, in processing order.
    pub assignments: Vec<AssignmentReport>,
}

impl RunSummary {
    /// Creates an empty summary.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            assignments: Vec::new(),
        }
    }

    /// Grades written, or that would have been.
    pub fn total_updates(&self) -> usize {
        self.assignments.iter().map(|a| a.updates).sum()
    }

    /// Submissions that already had the desired grade.
    pub fn total_unchanged(&self) -> usize {
        self.assignments.iter().map(|a| a.unchanged).sum()
    }

    /// Failed fetches and writes.
    pub fn total_errors(&self) -> usize {
        self.assignments.iter().map(|a| a.errors).sum()
    }

    /// `2` when a live run hit errors, else `0`.
    pub fn exit_code(&self) -> u8 {
        if !self.dry_run && self.total_errors() > 0 {
            EXIT_WRITE_ERRORS
        } else {
            0
        }
    }

    /// Renders the per-assignment table with a totals footer.
    pub fn render(&self) -> String {
        let title = if self.dry_run {
            "Completion Grading (dry run)"
        } else {
            "Completion Grading"
        };
        let footer = format!(
            "Assignments: {} | Updates: {} | Unchanged: {} | Errors: {}",
            self.assignments.len(),
            self.total_updates(),
            self.total_unchanged(),
            self.total_errors()
        );

        overview(Table::new(&self.assignments), title, footer)
    }
}

#[derive(Tabled, Clone, Debug)]
/// One line of the `assignments` listing
pub struct AssignmentRow {
    #[tabled(rename = "Id")]
    /// * `id`: assignment id
    pub id:           u64,
    #[tabled(rename = "Assignment")]
    /// * `name`: assignment name
    pub name:         String,
    #[tabled(rename = "Due")]
    /// * `due`: local due date or `-`
    pub due:          String,
    #[tabled(rename = "Grading type")]
    /// * `grading_type`: Canvas grading type
    pub grading_type: String,
    #[tabled(rename = "Verdict")]
    /// * `verdict`: `grade` or the reason it is skipped
    pub verdict:      String,
}

/// Renders the eligibility listing.
pub fn render_assignments(rows: &[AssignmentRow], window: &str) -> String {
    let gradable = rows.iter().filter(|r| r.verdict == "grade").count();
    overview(
        Table::new(rows),
        &format!("Assignments, due-date window {window}"),
        format!("{gradable} of {} would be graded", rows.len()),
    )
}

/// Applies the shared header/footer styling.
fn overview(mut table: Table, title: &str, footer: String) -> String {
    table
        .with(Panel::header(title))
        .with(Panel::footer(footer))
        .with(Modify::new(Rows::new(1..)).with(Width::wrap(32).keep_words(true)))
        .with(
            Modify::new(Rows::first())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(
            Modify::new(Rows::last())
                .with(Alignment::center())
                .with(Alignment::center_vertical()),
        )
        .with(Style::modern())
        .to_string()
}
