//! Retry logic for transient SOAP errors.
//!
//! Provides backoff for SOAP requests that fail with transient faults
//! (701, 714, 716) or timeouts.

use std::future::Future;
use std::time::Duration;

use crate::sonos::soap::SoapResult;

/// Retry delays for transient SOAP errors.
const RETRY_DELAYS_MS: [u64; 3] = [200, 500, 1000];

/// Runs `operation`, retrying transient failures after 200, 500 and 1000 ms.
///
/// Non-transient errors are returned immediately. After the last retry the
/// final transient error is returned.
///
/// # Arguments
/// * `action` - Action name for logging
/// * `operation` - Closure that performs the SOAP request
pub(crate) async fn with_retry<F, Fut>(action: &str, mut operation: F) -> SoapResult<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SoapResult<String>>,
{
    let mut result = operation().await;

    for (attempt, &delay_ms) in RETRY_DELAYS_MS.iter().enumerate() {
        match &result {
            Err(e) if e.is_transient() => {
                log::warn!("[SOAP] {} transient error: {}", action, e);
            }
            _ => return result,
        }

        log::info!(
            "[SOAP] Retrying {} (attempt {}/{}) after {}ms",
            action,
            attempt + 2,
            RETRY_DELAYS_MS.len() + 1,
            delay_ms
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        result = operation().await;
    }

    result
}
