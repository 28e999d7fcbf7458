use crate::utils::rng::draw_u64;
use std::future::Future;
use std::time::Duration;

/// Run `op` up to `max_attempts` times, pausing a uniform number of seconds
/// drawn from `delay_range_secs` (inclusive) between attempts.
///
/// Each invocation starts a fresh attempt counter; nothing is cached across
/// attempts, and the final failure propagates to the caller unmodified.
pub async fn with_retries<T, E, F, Fut>(
    label: &str,
    max_attempts: usize,
    delay_range_secs: [u64; 2],
    mut op: F,
) -> std::result::Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, E>>,
{
    let attempts = max_attempts.max(1);
    let mut attempt = 0usize;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= attempts {
                    return Err(err);
                }
                let pause = draw_u64(delay_range_secs);
                tracing::warn!(
                    "[RETRY] {label}: attempt {attempt}/{attempts} failed ({err}); retrying in {pause}s"
                );
                tokio::time::sleep(Duration::from_secs(pause)).await;
            }
        }
    }
}
