#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::time::Duration;

use reqwest::{
    Client, Method, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, RETRY_AFTER},
};
use serde::{Deserialize, de::DeserializeOwned};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{Assignment, CanvasError, Gradebook, Submission, link};
use crate::config::Config;

/// Page size requested from list endpoints; Canvas caps it at 100.
const PER_PAGE: &str = "100";

/// How hard the client pushes through rate limits and server errors.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts per request, including the first.
    pub max_attempts: u32,
    /// Upper bound on computed backoff delays.
    pub max_delay:    Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            max_delay:    Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after a transport or `5xx` failure:
    /// `0.25 * 2^attempt` seconds, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let secs = 0.25 * 2f64.powi(attempt.min(32) as i32);
        Duration::from_secs_f64(secs).min(self.max_delay)
    }

    /// Delay before retrying a `429`: `Retry-After + 1` seconds when the
    /// header is a whole number, else `2^attempt` seconds, capped.
    pub fn rate_limit_delay(&self, attempt: u32, retry_after: Option<&str>) -> Duration {
        match retry_after.and_then(|v| v.trim().parse::<u64>().ok()) {
            Some(secs) => Duration::from_secs(secs.saturating_add(1)),
            None => Duration::from_secs(2u64.saturating_pow(attempt)).min(self.max_delay),
        }
    }
}

/// One page of a list endpoint. Some endpoints answer with a bare object.
#[derive(Deserialize)]
#[serde(untagged)]
enum Page<T> {
    /// The usual JSON array.
    Many(Vec<T>),
    /// A single object.
    One(T),
}

/// Thin Canvas REST client.
#[derive(Debug, Clone)]
pub struct CanvasClient {
    /// Instance root, e.g. `https://canvas.example.edu`.
    base_url: String,
    /// Shared HTTP client carrying the auth headers.
    http:     Client,
    /// Retry behaviour for rate limits and server errors.
    retry:    RetryPolicy,
}

impl CanvasClient {
    /// Creates a client for `base_url` authenticating with `token`.
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, CanvasError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| CanvasError::InvalidToken)?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(CanvasError::Client)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            http,
            retry: RetryPolicy::default(),
        })
    }

    /// Creates a client from the run configuration.
    pub fn from_config(config: &Config) -> Result<Self, CanvasError> {
        Ok(Self::new(config.base_url(), config.token(), config.timeout())?.with_retry(
            RetryPolicy {
                max_attempts: config.max_attempts(),
                ..RetryPolicy::default()
            },
        ))
    }

    /// Replaces the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            max_attempts: retry.max_attempts.max(1),
            ..retry
        };
        self
    }

    /// Returns the instance root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request, sleeping through `429` and `5xx` replies and
    /// transport errors until the attempt budget runs out. The final
    /// response is returned whatever its status.
    async fn execute(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, &str)],
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CanvasError> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut request = self.http.request(method.clone(), url).query(query);
            if let Some(form) = form {
                request = request.form(form);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(source) if attempt < max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Request error ({source}); retrying in {:.1}s (attempt \
                         {attempt}/{max_attempts})",
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                    continue;
                }
                Err(source) => {
                    return Err(CanvasError::Transport {
                        method,
                        url: url.to_owned(),
                        source,
                    });
                }
            };

            let status = response.status();
            if attempt < max_attempts {
                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok());
                    let delay = self.retry.rate_limit_delay(attempt, retry_after);
                    warn!(
                        "Rate limited (429). Sleeping {}s then retrying (attempt \
                         {attempt}/{max_attempts})",
                        delay.as_secs()
                    );
                    sleep(delay).await;
                    continue;
                }
                if status.is_server_error() {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        "Server error {status}. Sleeping {:.1}s then retrying (attempt \
                         {attempt}/{max_attempts})",
                        delay.as_secs_f64()
                    );
                    sleep(delay).await;
                    continue;
                }
            }

            return Ok(response);
        }
    }

    /// Turns a non-success response into [`CanvasError::Status`].
    async fn ensure_success(
        method: Method,
        url: &str,
        response: Response,
    ) -> Result<Response, CanvasError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(CanvasError::Status {
            method,
            url: url.to_owned(),
            status,
            body,
        })
    }

    /// Fetches every page of a list endpoint, following `rel="next"` links.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, CanvasError> {
        let mut items = Vec::new();
        let mut url = format!("{}{}", self.base_url, path);
        // Next links already carry the query string.
        let mut query = query;

        loop {
            let response = self.execute(Method::GET, &url, query, None).await?;
            let response = Self::ensure_success(Method::GET, &url, response).await?;

            let next = response
                .headers()
                .get(LINK)
                .and_then(|v| v.to_str().ok())
                .and_then(link::next_url);
            let body = response
                .bytes()
                .await
                .map_err(|source| CanvasError::Transport {
                    method: Method::GET,
                    url: url.clone(),
                    source,
                })?;

            match serde_json::from_slice::<Page<T>>(&body)
                .map_err(|source| CanvasError::Decode { url: url.clone(), source })?
            {
                Page::Many(page) => items.extend(page),
                Page::One(item) => items.push(item),
            }

            match next {
                Some(next) => {
                    debug!("Following next page {next}");
                    url = next;
                    query = &[];
                }
                None => break,
            }
        }

        Ok(items)
    }
}

impl Gradebook for CanvasClient {
    async fn list_assignments(&self, course_id: &str) -> Result<Vec<Assignment>, CanvasError> {
        self.get_paginated(
            &format!("/api/v1/courses/{course_id}/assignments"),
            &[("per_page", PER_PAGE)],
        )
        .await
    }

    async fn list_submissions(
        &self,
        course_id: &str,
        assignment_id: u64,
    ) -> Result<Vec<Submission>, CanvasError> {
        self.get_paginated(
            &format!("/api/v1/courses/{course_id}/assignments/{assignment_id}/submissions"),
            &[("per_page", PER_PAGE), ("include[]", "user")],
        )
        .await
    }

    async fn update_grade(
        &self,
        course_id: &str,
        assignment_id: u64,
        user_id: u64,
        posted_grade: &str,
    ) -> Result<(), CanvasError> {
        let url = format!(
            "{}/api/v1/courses/{course_id}/assignments/{assignment_id}/submissions/{user_id}",
            self.base_url
        );
        let response = self
            .execute(
                Method::PUT,
                &url,
                &[],
                Some(&[("submission[posted_grade]", posted_grade)][..]),
            )
            .await?;
        Self::ensure_success(Method::PUT, &url, response).await?;
        Ok(())
    }
}
