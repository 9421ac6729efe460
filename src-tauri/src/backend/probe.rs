//! Readiness probe for the backend HTTP server.
//!
//! Any HTTP response counts as "up": the server can answer 404 while its
//! routes are still being registered. Connection errors are swallowed and
//! retried on the next tick.

use std::time::Duration;
use tokio::time::MissedTickBehavior;

/// Upper bound on a single probe request, so a half-open connection cannot
/// stall the loop.
const PROBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Backend at {endpoint} did not respond within {}ms", .waited.as_millis())]
    TimedOut { endpoint: String, waited: Duration },
}

/// Poll `endpoint` every `interval` until it answers.
///
/// With `timeout: None` this never gives up. Returns the number of attempts
/// it took.
pub async fn await_ready(
    client: &reqwest::Client,
    endpoint: &str,
    interval: Duration,
    timeout: Option<Duration>,
) -> Result<u32, ProbeError> {
    log::info!(
        "[PROBE] Waiting for backend at {} (every {}ms, {})",
        endpoint,
        interval.as_millis(),
        match timeout {
            Some(limit) => format!("timeout {}ms", limit.as_millis()),
            None => "no timeout".to_string(),
        }
    );

    let poll = poll_until_ready(client, endpoint, interval);
    match timeout {
        None => Ok(poll.await),
        Some(limit) => tokio::time::timeout(limit, poll)
            .await
            .map_err(|_| ProbeError::TimedOut {
                endpoint: endpoint.to_string(),
                waited: limit,
            }),
    }
}

async fn poll_until_ready(client: &reqwest::Client, endpoint: &str, interval: Duration) -> u32 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut attempts = 0u32;

    loop {
        ticker.tick().await;
        attempts += 1;
        match client
            .get(endpoint)
            .timeout(PROBE_REQUEST_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => {
                log::info!(
                    "[PROBE] Backend is responding (HTTP {}) after {} attempt(s)",
                    resp.status().as_u16(),
                    attempts
                );
                return attempts;
            }
            Err(e) => {
                log::debug!("[PROBE] Attempt {} failed: {}", attempts, e);
            }
        }
    }
}
