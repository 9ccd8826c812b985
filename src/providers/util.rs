use anyhow::{Context, Error, Result, anyhow};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Upper wall-clock bound for any single outbound request. A stuck quote
/// endpoint is abandoned after this, independent of retry policy.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One client per provider; it pools connections across requests.
pub fn build_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("fnav/0.2")
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")
}

/// Retries an async operation with configurable attempts and delays
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the error after all attempts
pub async fn with_retry<F, Fut, T>(
    mut operation: F,
    retries: usize,
    delay_ms: u64,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, reqwest::Error>>,
{
    let mut attempt = 1;
    loop {
        match operation().await.map_err(anyhow::Error::from) {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Extracts the JSON body from a JSONP document like `jsonpgz({...});`.
/// An empty call (`jsonpgz();`) or a document without a callback wrapper
/// is an error.
pub fn strip_jsonp(document: &str) -> Result<&str> {
    let open = document
        .find('(')
        .ok_or_else(|| anyhow!("Not a JSONP document"))?;
    let close = document
        .rfind(')')
        .filter(|&close| close > open)
        .ok_or_else(|| anyhow!("Unterminated JSONP document"))?;

    let body = document[open + 1..close].trim();
    if body.is_empty() {
        return Err(anyhow!("Empty JSONP payload"));
    }
    Ok(body)
}

/// Exchange prefix for a mainland security code: Shanghai listings start
/// with 6, everything else trades on Shenzhen.
pub fn exchange_prefix(code: &str) -> &'static str {
    if code.starts_with('6') { "sh" } else { "sz" }
}
