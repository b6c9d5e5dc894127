// Retry policy + exponential backoff

use std::time::Duration;

/// Delay for attempt k (0-based) is `base * multiplier^k`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub multiplier: f64,
}

impl Backoff {
    pub fn new(base_secs: f64, multiplier: f64) -> Self {
        Backoff {
            base: Duration::from_secs_f64(base_secs.max(0.0)),
            multiplier,
        }
    }

    /// No waiting between attempts (tests, local mocks)
    pub fn immediate() -> Self {
        Backoff {
            base: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt as i32);
        if !factor.is_finite() || factor < 0.0 {
            return self.base;
        }
        self.base.mul_f64(factor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_statuses: Vec<u16>,
    pub retry_transport: bool,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, retry_statuses: &[u16], backoff: Backoff) -> Self {
        RetryPolicy {
            max_retries,
            retry_statuses: retry_statuses.to_vec(),
            retry_transport: true,
            backoff,
        }
    }

    pub fn none() -> Self {
        RetryPolicy {
            max_retries: 0,
            retry_statuses: Vec::new(),
            retry_transport: false,
            backoff: Backoff::immediate(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn should_retry_status(&self, status: u16, attempt: u32) -> bool {
        attempt < self.max_retries && self.retry_statuses.contains(&status)
    }

    pub fn should_retry_transport(&self, attempt: u32) -> bool {
        self.retry_transport && attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(3, &[429, 500, 502, 503, 504], Backoff::new(1.0, 2.0))
    }
}
