/*!
 * Retry policy for provider calls.
 *
 * The policy is a pure function of the attempt number and the failure, so
 * the translation client only has to sleep for whatever it is told.
 */

use std::fmt;
use std::time::Duration;

/// Why a single provider attempt did not produce usable content
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    /// HTTP 429
    RateLimited,
    /// Any other non-success status
    Status(u16),
    /// Network error, timeout, unreadable body
    Transport(String),
    /// Success status without a non-empty text payload
    Malformed,
}

impl AttemptFailure {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16) -> Self {
        if status == 429 {
            Self::RateLimited
        } else {
            Self::Status(status)
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limited (HTTP 429)"),
            Self::Status(code) => write!(f, "HTTP error {}", code),
            Self::Transport(message) => write!(f, "transport error: {}", message),
            Self::Malformed => write!(f, "response has no text payload"),
        }
    }
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the given delay, then try again
    Retry(Duration),
    /// Stop and fall back to the original text
    GiveUp,
}

/// Linear backoff: `attempt * step`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    step: Duration,
}

impl Backoff {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }

    /// Delay after the given 1-based attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt)
    }
}

/// Bounded retry policy shared by every batch of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
}

impl RetryPolicy {
    /// `max_attempts` counts the first attempt; zero is treated as one
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy from the configured retry count and backoff step
    pub fn from_millis(max_attempts: u32, backoff_ms: u64) -> Self {
        Self::new(max_attempts, Backoff::new(Duration::from_millis(backoff_ms)))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide what follows the failed 1-based `attempt`
    pub fn decide(&self, attempt: u32, failure: &AttemptFailure) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp;
        }

        match failure {
            AttemptFailure::Malformed => RetryDecision::GiveUp,
            AttemptFailure::RateLimited
            | AttemptFailure::Status(_)
            | AttemptFailure::Transport(_) => RetryDecision::Retry(self.backoff.delay(attempt)),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(3, 2000)
    }
}
