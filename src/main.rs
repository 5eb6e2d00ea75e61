#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # canvas-complete
//!
//! Marks Canvas assignments Complete/Incomplete based on whether each
//! student submitted, for assignments whose due date is inside the grading
//! window.
//!
//! Configure it with `CANVAS_BASE_URL`, `CANVAS_TOKEN` and `COURSE_ID` (a
//! `.env` file in the working directory is picked up), then preview with
//! `canvas-complete run` and write grades with `canvas-complete run --apply`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use bpaf::*;
use canvas_complete::{
    canvas::CanvasClient,
    config::{Config, Overrides},
    report::render_assignments,
    run::CompletionGrader,
    window::{WindowSpec, should_run_now},
};
use chrono::{DateTime, Utc};
use colored::Colorize;
use dotenvy::dotenv;
use tracing::{info, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade eligible assignments
    Run(Overrides),
    /// List assignments with their eligibility
    Assignments(Overrides),
    /// Print the current due-date window
    Window(Overrides),
}

impl Cmd {
    /// Returns the overrides given alongside the command.
    fn overrides(&self) -> &Overrides {
        match self {
            Cmd::Run(o) | Cmd::Assignments(o) | Cmd::Window(o) => o,
        }
    }
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the flags shared by every command
    fn overrides() -> impl Parser<Overrides> {
        let apply = long("apply")
            .help("Write grades to Canvas even if DRY_RUN is set")
            .switch();
        let dry_run = long("dry-run")
            .help("Only log the grades that would change")
            .switch();
        let course = long("course")
            .help("Course to grade, instead of COURSE_ID")
            .argument::<String>("COURSE_ID")
            .optional();
        let grace_days = long("grace-days")
            .help("Days after the due date before grading opens, instead of GRACE_DAYS")
            .argument::<u32>("DAYS")
            .optional();
        let window_days = long("window-days")
            .help("Days grading stays open, instead of WINDOW_DAYS")
            .argument::<u32>("DAYS")
            .optional();
        let group = long("group")
            .help("Only grade this assignment group, instead of ASSIGNMENT_GROUP_ID")
            .argument::<String>("GROUP_ID")
            .optional();
        let now = long("now")
            .help("Grade as if it were this RFC 3339 instant")
            .argument::<String>("TIMESTAMP")
            .parse(|s| DateTime::parse_from_rfc3339(&s).map(|d| d.with_timezone(&Utc)))
            .optional();

        construct!(Overrides {
            apply,
            dry_run,
            course,
            grace_days,
            window_days,
            group,
            now
        })
    }

    let run = construct!(Cmd::Run(overrides()))
        .to_options()
        .command("run")
        .help("Grade eligible assignments (a dry run unless --apply or DRY_RUN=false)");

    let assignments = construct!(Cmd::Assignments(overrides()))
        .to_options()
        .command("assignments")
        .help("List course assignments and whether a run would grade them");

    let window = construct!(Cmd::Window(overrides()))
        .to_options()
        .command("window")
        .help("Print the due-date window a run would use");

    let cmd = construct!([run, assignments, window]);

    cmd.to_options()
        .descr("Completion grading for Canvas courses")
        .version(env!("CARGO_PKG_VERSION"))
        .run()
}

/// Executes a parsed command against a loaded configuration.
async fn dispatch(cmd: Cmd, config: Config) -> Result<ExitCode> {
    let now = config.now();
    let tz = config.timezone();
    let window = WindowSpec::from_config(&config).due_range(now);

    match cmd {
        Cmd::Window(_) => {
            println!("{}", window.in_zone(tz));
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Assignments(_) => {
            let client = CanvasClient::from_config(&config)?;
            let rows = CompletionGrader::builder()
                .gradebook(&client)
                .config(&config)
                .now(now)
                .build()
                .preview()
                .await?;

            println!("{}", render_assignments(&rows, &window.in_zone(tz).to_string()));
            Ok(ExitCode::SUCCESS)
        }
        Cmd::Run(_) => {
            if !should_run_now(config.enforce_thursday_5pm(), now, tz) {
                info!(
                    "ENFORCE_THURSDAY_5PM is on. Now is {}, not Thu 5:00pm. Exiting.",
                    now.with_timezone(&tz).to_rfc3339()
                );
                return Ok(ExitCode::SUCCESS);
            }

            let client = CanvasClient::from_config(&config)
                .context("Could not set up the Canvas client")?;
            let summary = CompletionGrader::builder()
                .gradebook(&client)
                .config(&config)
                .now(now)
                .build()
                .run()
                .await?;

            eprintln!("{}", summary.render());
            if summary.dry_run {
                eprintln!(
                    "{}",
                    "Dry run: no grades were written. Pass --apply to write them.".yellow()
                );
            } else if summary.total_errors() > 0 {
                eprintln!(
                    "{}",
                    format!("{} grade(s) could not be fetched or written.", summary.total_errors())
                        .red()
                );
            }

            Ok(ExitCode::from(summary.exit_code()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv().ok();

    let cmd = options();
    let config = Config::from_env()?.with_overrides(cmd.overrides().clone());

    let fmt = fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(config.log_level());
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    tokio::select! {
        code = dispatch(cmd, config) => code,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted.");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
    }
}
