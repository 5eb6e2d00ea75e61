use reqwest::{Method, StatusCode};

/// An enum to represent possible failures while talking to Canvas
#[derive(thiserror::Error, Debug)]
pub enum CanvasError {
    /// The HTTP client could not be constructed.
    #[error("Could not build the Canvas HTTP client")]
    Client(#[source] reqwest::Error),
    /// The API token contains characters that cannot go in a header.
    #[error("CANVAS_TOKEN is not a valid header value")]
    InvalidToken,
    /// The request never produced a response.
    #[error("{method} {url} could not be sent")]
    Transport {
        /// HTTP method of the request
        method: Method,
        /// Full request URL
        url:    String,
        /// Underlying reqwest error
        #[source]
        source: reqwest::Error,
    },
    /// Canvas answered with a non-success status.
    #[error("{method} {url} failed: {status} {body}")]
    Status {
        /// HTTP method of the request
        method: Method,
        /// Full request URL
        url:    String,
        /// Status code returned
        status: StatusCode,
        /// Response body, as text
        body:   String,
    },
    /// The response body was not the JSON we expected.
    #[error("Could not decode the response from {url}")]
    Decode {
        /// Full request URL
        url:    String,
        /// Underlying serde error
        #[source]
        source: serde_json::Error,
    },
}

impl CanvasError {
    /// Returns the HTTP status if Canvas answered with an error status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CanvasError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
