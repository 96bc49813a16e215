//! Exponential backoff with jitter.
//!
//! Shared by the Router's per-attempt backoff (`min(500*(attempt+1), 2000)`
//! ms between failed attempts) and, via `gateway-webhooks`, the
//! per-subscription retry schedule
//! (`min(initialDelayMs * multiplier^(a-1) + jitter, maxDelayMs)` with
//! `jitter` uniform in `[0, 0.1*delay)`). The jitter is one-sided
//! (`[0, jitter_factor*delay)`) rather than a symmetric spread either side
//! of the base delay.

use rand::Rng;
use std::time::Duration;

/// Backoff configuration. `attempt` is 0-indexed: `delay_for_attempt(0)`
/// is the delay before the first retry.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
    /// Base/initial delay.
    pub base_delay: Duration,
    /// Maximum delay, regardless of attempt number.
    pub max_delay: Duration,
    /// Backoff multiplier applied per attempt.
    pub multiplier: f64,
    /// Fraction of the computed delay added as uniform random jitter,
    /// in `[0, jitter_factor * delay)`.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(300_000),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Backoff calculator. Stateless beyond its configuration; safe to share
/// across tasks.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Create a new retry policy with the given configuration.
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Create a policy with a custom max-retries, defaults otherwise.
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self::new(RetryConfig {
            max_retries,
            ..Default::default()
        })
    }

    /// Delay before retry attempt `attempt` (0-indexed):
    /// `min(base * multiplier^attempt + jitter, max_delay)`, where
    /// `jitter` is uniform in `[0, jitter_factor * delay)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.config.base_delay.as_millis() as f64;
        let delay = (base * self.config.multiplier.powi(attempt as i32))
            .min(self.config.max_delay.as_millis() as f64);

        let jitter_range = delay * self.config.jitter_factor;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(0.0..jitter_range)
        } else {
            0.0
        };

        let final_delay = (delay + jitter).min(self.config.max_delay.as_millis() as f64);
        Duration::from_millis(final_delay as u64)
    }

    /// Whether `attempt` (0-indexed, about to be made) is still within
    /// the configured retry budget.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.config.max_retries
    }

    /// The configuration backing this policy.
    #[must_use]
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    config: RetryConfig,
}

impl RetryPolicyBuilder {
    /// Create a new builder, starting from [`RetryConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max retries.
    #[must_use]
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    /// Set base delay.
    #[must_use]
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    /// Set max delay.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    /// Set backoff multiplier.
    #[must_use]
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.multiplier = multiplier;
        self
    }

    /// Set the jitter fraction, clamped to `0.0..=1.0`.
    #[must_use]
    pub fn jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.config.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// Build the policy.
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy::new(self.config)
    }
}
