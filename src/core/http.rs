//! HTTP client utilities.
//!
//! Provides the shared HTTP client and response classification used by the
//! OAuth, Drive and Telegram calls.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, Response};

use crate::error::{DqaError, Result};

/// Longest error body excerpt carried into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("dqa/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DqaError::Network(e.to_string()))
}

/// Map a transport-level failure. The URL is dropped from the message since
/// some endpoints carry secrets in the path.
#[must_use]
pub fn classify_send_error(err: reqwest::Error, timeout: Duration) -> DqaError {
    if err.is_timeout() {
        DqaError::Timeout(timeout.as_secs())
    } else {
        let err = err.without_url();
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        DqaError::Network(message)
    }
}

/// Return the response if it succeeded, otherwise an [`DqaError::ApiError`]
/// carrying a short excerpt of the body.
///
/// # Errors
///
/// Returns `ApiError` for any non-2xx status.
pub async fn error_for_status(response: Response, service: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(DqaError::ApiError {
        service,
        status: status.as_u16(),
        message: excerpt(&body),
    })
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    match trimmed.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_client_succeeds() {
        assert!(build_client(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn excerpt_truncates_long_bodies() {
        let body = "x".repeat(500);
        let short = excerpt(&body);
        assert_eq!(short.len(), MAX_ERROR_BODY + 3);
        assert!(short.ends_with("..."));
    }

    #[test]
    fn excerpt_reports_empty_body() {
        assert_eq!(excerpt("  \n"), "empty response body");
    }
}
