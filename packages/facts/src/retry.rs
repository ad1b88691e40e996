//! HTTP retry helper for transient upstream errors.
//!
//! Every upstream client sends requests through [`send_json`] instead of
//! calling `reqwest::RequestBuilder::send()` directly, so each lookup gets
//! automatic retry with exponential backoff for timeouts, connection
//! resets, server errors, and rate limiting.
//!
//! ```ignore
//! let body = retry::send_json(|| client.get(&url).query(&params)).await?;
//! ```

use std::time::Duration;

use crate::FactsError;

/// Maximum number of retry attempts for transient HTTP errors.
///
/// Lookups are interactive, so the budget is small: with exponential
/// backoff (1s, 2s, 4s) the total wait before giving up is 7 seconds.
const MAX_RETRIES: u32 = 3;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum length of the response body preview included in errors.
const BODY_PREVIEW_LEN: usize = 300;

/// What to do with a response of a given status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    /// Accept the response.
    Accept,
    /// Try again after a backoff.
    Retry,
    /// Give up: the request itself is wrong.
    Fail,
}

/// Classifies a response status: 429 and 5xx are retried, other 4xx are
/// permanent.
#[must_use]
pub fn classify_status(status: reqwest::StatusCode) -> StatusAction {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else if status.is_client_error() {
        StatusAction::Fail
    } else {
        StatusAction::Accept
    }
}

/// Backoff before retry `attempt` (1-based): 1s, 2s, 4s, ...
#[must_use]
pub const fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1u64 << attempt.saturating_sub(1))
}

/// Builds the shared HTTP client with the request timeout applied.
///
/// # Errors
///
/// Returns [`FactsError::Http`] if the TLS backend cannot be initialized.
pub fn client() -> Result<reqwest::Client, FactsError> {
    Ok(reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?)
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (since builders are consumed by
/// `.send()`).
///
/// Does **not** retry HTTP 4xx (except 429); these are permanent.
///
/// # Errors
///
/// Returns [`FactsError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body is not JSON.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(build_request: F) -> Result<serde_json::Value, FactsError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = send_inner(&build_request).await?;
    let url = response.url().to_string();
    let text = response.text().await?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!("JSON parse failed for {url}: {e}\n  body preview: {preview}");
        FactsError::Parse {
            message: format!("{url} returned invalid JSON: {e}"),
        }
    })
}

#[allow(clippy::future_not_send)]
async fn send_inner<F>(build_request: &F) -> Result<reqwest::Response, FactsError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = backoff(attempt);
            log::warn!("  retry {attempt}/{MAX_RETRIES} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < MAX_RETRIES {
                    log::warn!("  transient error: {e}");
                    attempt += 1;
                    continue;
                }
                return Err(FactsError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                match classify_status(status) {
                    StatusAction::Accept => return Ok(response),
                    StatusAction::Retry if attempt < MAX_RETRIES => {
                        log::warn!("  HTTP {status} from {}", response.url());
                        attempt += 1;
                    }
                    StatusAction::Retry => {
                        return Err(FactsError::Parse {
                            message: format!("HTTP {status} after {MAX_RETRIES} retries"),
                        });
                    }
                    StatusAction::Fail => {
                        return Err(FactsError::Parse {
                            message: format!("HTTP {status} from {}", response.url()),
                        });
                    }
                }
            }
        }
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}
