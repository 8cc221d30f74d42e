//! Load retry policy.
//!
//! One policy instance is shared between a session and its engine's network
//! loader. Acquisitions replace the options behind the shared handle, so the
//! loader always consults the latest settings without being rebuilt.

use bridge_traits::LoadErrorPolicy;
use core_runtime::config::PlaybackOptions;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of consulting the policy after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Stop,
    RetryAfter(Duration),
}

/// Linear-then-capped backoff over [`PlaybackOptions`].
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    options: Arc<RwLock<PlaybackOptions>>,
}

impl RetryPolicy {
    pub fn new(options: PlaybackOptions) -> Self {
        Self {
            options: Arc::new(RwLock::new(options)),
        }
    }

    /// Replace the options seen by every holder of this policy.
    pub fn replace(&self, options: PlaybackOptions) {
        *self.options.write() = options;
    }

    pub fn options(&self) -> PlaybackOptions {
        self.options.read().clone()
    }

    /// Decide what to do after the `error_count`-th failure (1-based; `0`
    /// counts as the first).
    pub fn decide(&self, error_count: u32) -> RetryDecision {
        let options = self.options.read();
        decide_with(&options, error_count)
    }
}

fn decide_with(options: &PlaybackOptions, error_count: u32) -> RetryDecision {
    if !options.auto_retry {
        return RetryDecision::Stop;
    }

    let attempt = error_count.max(1);
    if options.max_retry_count >= 0 && i64::from(attempt) > i64::from(options.max_retry_count) {
        return RetryDecision::Stop;
    }

    let delay_ms = options
        .initial_retry_delay_ms
        .saturating_mul(u64::from(attempt))
        .min(options.max_retry_delay_ms);
    RetryDecision::RetryAfter(Duration::from_millis(delay_ms))
}

impl LoadErrorPolicy for RetryPolicy {
    fn retry_delay(&self, error_count: u32) -> Option<Duration> {
        match self.decide(error_count) {
            RetryDecision::Stop => None,
            RetryDecision::RetryAfter(delay) => Some(delay),
        }
    }

    fn minimum_loadable_retry_count(&self) -> Option<u32> {
        u32::try_from(self.options.read().max_retry_count).ok()
    }
}
