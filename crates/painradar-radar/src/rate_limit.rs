//! Per-platform request admission and retry with backoff.
//!
//! [`RateLimiter`] keeps a sliding window of request timestamps for each
//! platform. It is cheap to clone; clones share the same windows, so one
//! instance is created at startup and handed to every adapter.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use painradar_core::Platform;
use tokio::time::Instant;

use crate::error::RadarError;

const SLOT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum number of requests admitted per sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformQuota {
    pub max_requests: usize,
    pub window: Duration,
}

impl PlatformQuota {
    /// Upstream quota for each platform.
    #[must_use]
    pub fn for_platform(platform: Platform) -> Self {
        const MINUTE: u64 = 60;
        let (max_requests, window_secs) = match platform {
            Platform::Reddit | Platform::Pikabu => (60, MINUTE),
            Platform::HackerNews => (1000, MINUTE),
            Platform::Habr | Platform::VcRu => (100, MINUTE),
            Platform::LinkedIn => (20, MINUTE),
            Platform::Telegram | Platform::Web => (30, MINUTE),
            Platform::Twitter => (300, 15 * MINUTE),
            Platform::Threads => (100, 60 * MINUTE),
            Platform::Instagram => (200, 60 * MINUTE),
        };
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<Platform, VecDeque<Instant>>>>,
    overrides: HashMap<Platform, PlatformQuota>,
}

impl RateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the quota for one platform. Intended for tests and tuning.
    #[must_use]
    pub fn with_quota(mut self, platform: Platform, quota: PlatformQuota) -> Self {
        self.overrides.insert(platform, quota);
        self
    }

    #[must_use]
    pub fn quota(&self, platform: Platform) -> PlatformQuota {
        self.overrides
            .get(&platform)
            .copied()
            .unwrap_or_else(|| PlatformQuota::for_platform(platform))
    }

    /// Try to take a slot for `platform`.
    ///
    /// Returns `true` and records the request when the window still has
    /// capacity after evicting expired entries; returns `false` otherwise.
    pub fn check_limit(&self, platform: Platform) -> bool {
        let quota = self.quota(platform);
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(platform).or_default();
        evict_expired(window, now, quota.window);

        if window.len() >= quota.max_requests {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Wait until a slot is free for `platform`, then take it.
    ///
    /// Polls once per second; only the calling task sleeps.
    pub async fn wait_for_slot(&self, platform: Platform) {
        let mut waited = false;
        while !self.check_limit(platform) {
            if !waited {
                tracing::debug!(
                    %platform,
                    wait_ms = self.time_until_next_slot(platform).as_millis(),
                    "rate limit reached, waiting for a slot"
                );
                waited = true;
            }
            tokio::time::sleep(SLOT_POLL_INTERVAL).await;
        }
    }

    /// How long until the oldest request leaves the window; zero when a slot
    /// is available now.
    #[must_use]
    pub fn time_until_next_slot(&self, platform: Platform) -> Duration {
        let quota = self.quota(platform);
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(window) = windows.get_mut(&platform) else {
            return Duration::ZERO;
        };
        evict_expired(window, now, quota.window);

        if window.len() < quota.max_requests {
            return Duration::ZERO;
        }
        window.front().map_or(Duration::ZERO, |oldest| {
            quota.window.saturating_sub(now.duration_since(*oldest))
        })
    }
}

fn evict_expired(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while window
        .front()
        .is_some_and(|t| now.duration_since(*t) >= span)
    {
        window.pop_front();
    }
}

/// Runs `operation` up to `max_attempts` times, backing off between tries.
///
/// Back-off schedule with `backoff_base_ms = 1_000`:
///
/// | Failed attempt | Sleep before next attempt    |
/// |----------------|------------------------------|
/// | 1              | 1 000 ms × 2⁰ ± 25 % jitter |
/// | 2              | 1 000 ms × 2¹ ± 25 % jitter |
///
/// A [`RadarError::RateLimited`] failure waits at least its `Retry-After`.
/// Delay is capped at 60 s. Errors for which [`RadarError::is_retriable`] is
/// `false` are returned on the first failure; otherwise the last error is
/// returned once attempts run out.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_attempts: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, RadarError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RadarError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if !err.is_retriable() || attempt >= max_attempts {
                    return Err(err);
                }
                let delay_ms = retry_delay_ms(&err, attempt, backoff_base_ms);
                tracing::warn!(
                    attempt,
                    max_attempts,
                    delay_ms,
                    error = %err,
                    "transient platform error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

const MAX_DELAY_MS: u64 = 60_000;

/// Jittered exponential back-off for the given failed attempt, raised to the
/// server's `Retry-After` when the failure was a 429.
fn retry_delay_ms(err: &RadarError, attempt: u32, backoff_base_ms: u64) -> u64 {
    let computed = backoff_base_ms
        .saturating_mul(1u64 << (attempt - 1).min(10))
        .min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (computed as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    let floor = match err {
        RadarError::RateLimited {
            retry_after_secs, ..
        } => retry_after_secs.saturating_mul(1000),
        _ => 0,
    };
    jittered.max(floor).min(MAX_DELAY_MS)
}
