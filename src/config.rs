#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::Level;
use typed_builder::TypedBuilder;

/// Variables that must be present for any run.
const REQUIRED: [&str; 3] = ["CANVAS_BASE_URL", "CANVAS_TOKEN", "COURSE_ID"];

/// Errors raised while assembling a [`Config`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// One or more required variables are unset or blank.
    #[error(
        "Missing required environment variables: {}\nSet them and try again. See .env.example.",
        .0.join(", ")
    )]
    Missing(Vec<&'static str>),
    /// A day count or numeric setting could not be parsed.
    #[error("`{name}` must be a non-negative whole number, found `{value}`")]
    InvalidNumber {
        /// Name of the offending variable
        name:  &'static str,
        /// Raw value as read from the environment
        value: String,
    },
    /// `TIMEZONE` does not name an IANA zone.
    #[error("`TIMEZONE` is not a known IANA time zone: `{0}`")]
    UnknownTimezone(String),
}

/// Everything a grading run needs to know.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
#[builder(doc)]
pub struct Config {
    /// Canvas instance root, without a trailing slash.
    base_url:                    String,
    /// API bearer token.
    token:                       String,
    /// Course whose gradebook is updated.
    course_id:                   String,
    /// Days after the due date before an assignment can be graded.
    #[builder(default = 1)]
    grace_days:                  u32,
    /// Days an assignment stays gradable once the grace period is over.
    #[builder(default = 7)]
    window_days:                 u32,
    /// Only grade assignments belonging to this assignment group.
    #[builder(default, setter(strip_option))]
    assignment_group_id:         Option<String>,
    /// Log intended changes without writing them.
    #[builder(default = true)]
    dry_run:                     bool,
    /// Verbosity of the tracing subscriber.
    #[builder(default = Level::INFO)]
    log_level:                   Level,
    /// Zone used for the schedule gate and for human-readable window bounds.
    #[builder(default = chrono_tz::America::Denver)]
    timezone:                    Tz,
    /// Only act on Thursdays at 17:00 local time.
    #[builder(default = false)]
    enforce_thursday_5pm:        bool,
    /// Only grade assignments whose grading type is `complete_incomplete`.
    #[builder(default = true)]
    require_complete_incomplete: bool,
    /// Per-request HTTP timeout.
    #[builder(default = Duration::from_secs(30))]
    timeout:                     Duration,
    /// Attempts per request before a rate-limit or server error is surfaced.
    #[builder(default = 8)]
    max_attempts:                u32,
    /// Fixed instant to grade against instead of the wall clock.
    #[builder(default, setter(strip_option))]
    now:                         Option<DateTime<Utc>>,
}

/// Values given on the command line that take precedence over the
/// environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Write grades even if `DRY_RUN` is on.
    pub apply:       bool,
    /// Preview only, even if `DRY_RUN` is off.
    pub dry_run:     bool,
    /// Course to grade.
    pub course:      Option<String>,
    /// Grace period in days.
    pub grace_days:  Option<u32>,
    /// Window length in days.
    pub window_days: Option<u32>,
    /// Assignment group to restrict the run to.
    pub group:       Option<String>,
    /// Instant to grade against.
    pub now:         Option<DateTime<Utc>>,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&'static str> = REQUIRED
            .into_iter()
            .filter(|name| read(name).is_none())
            .collect();
        let (Some(base_url), Some(token), Some(course_id)) =
            (read("CANVAS_BASE_URL"), read("CANVAS_TOKEN"), read("COURSE_ID"))
        else {
            return Err(ConfigError::Missing(missing));
        };

        let timezone = match read("TIMEZONE") {
            Some(name) => Tz::from_str(&name).map_err(|_| ConfigError::UnknownTimezone(name))?,
            None => chrono_tz::America::Denver,
        };

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token,
            course_id,
            grace_days: parse_number("GRACE_DAYS", read("GRACE_DAYS"), 1)?,
            window_days: parse_number("WINDOW_DAYS", read("WINDOW_DAYS"), 7)?,
            assignment_group_id: read("ASSIGNMENT_GROUP_ID"),
            dry_run: parse_bool(read("DRY_RUN"), true),
            log_level: parse_level(read("LOG_LEVEL")),
            timezone,
            enforce_thursday_5pm: parse_bool(read("ENFORCE_THURSDAY_5PM"), false),
            require_complete_incomplete: parse_bool(read("REQUIRE_COMPLETE_INCOMPLETE"), true),
            timeout: Duration::from_secs(parse_number(
                "CANVAS_TIMEOUT_SECS",
                read("CANVAS_TIMEOUT_SECS"),
                30,
            )?),
            max_attempts: parse_number("CANVAS_MAX_ATTEMPTS", read("CANVAS_MAX_ATTEMPTS"), 8)?
                .max(1),
            now: None,
        })
    }

    /// Applies command line overrides on top of this configuration.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.apply {
            self.dry_run = false;
        }
        if overrides.dry_run {
            self.dry_run = true;
        }
        if let Some(course) = overrides.course {
            self.course_id = course;
        }
        if let Some(days) = overrides.grace_days {
            self.grace_days = days;
        }
        if let Some(days) = overrides.window_days {
            self.window_days = days;
        }
        if let Some(group) = overrides.group {
            self.assignment_group_id = Some(group);
        }
        if overrides.now.is_some() {
            self.now = overrides.now;
        }
        self
    }

    /// Returns the Canvas instance root.
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Returns the API token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the course identifier.
    pub fn course_id(&self) -> &str {
        &self.course_id
    }

    /// Returns the grace period in days.
    pub fn grace_days(&self) -> u32 {
        self.grace_days
    }

    /// Returns the window length in days.
    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    /// Returns the assignment group filter, if any.
    pub fn assignment_group_id(&self) -> Option<&str> {
        self.assignment_group_id.as_deref()
    }

    /// Returns whether this is a preview run.
    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    /// Returns the configured log level.
    pub fn log_level(&self) -> Level {
        self.log_level
    }

    /// Returns the configured time zone.
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Returns whether the Thursday 17:00 gate is active.
    pub fn enforce_thursday_5pm(&self) -> bool {
        self.enforce_thursday_5pm
    }

    /// Returns whether only `complete_incomplete` assignments are graded.
    pub fn require_complete_incomplete(&self) -> bool {
        self.require_complete_incomplete
    }

    /// Returns the HTTP timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the attempt budget per request.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Instant the run grades against: the `--now` override, else the clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }
}

/// `1`, `true`, `yes`, `y` and `on` are true; anything else set is false.
fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on"),
        None => default,
    }
}

/// Parses an optional numeric variable, falling back to `default` when unset.
fn parse_number<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
        None => Ok(default),
    }
}

/// Accepts tracing's level names plus `WARNING` and `CRITICAL`.
/// Unrecognised levels fall back to `INFO`.
fn parse_level(value: Option<String>) -> Level {
    let Some(value) = value else {
        return Level::INFO;
    };
    match value.to_ascii_uppercase().as_str() {
        "WARNING" => Level::WARN,
        "CRITICAL" | "FATAL" => Level::ERROR,
        other => Level::from_str(other).unwrap_or(Level::INFO),
    }
}
