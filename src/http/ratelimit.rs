// Client-side rate limiting

use log::debug;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Minimum spacing between request starts
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        RateLimiter {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// `None` when `per_second` is not positive (unlimited)
    pub fn per_second(per_second: f64) -> Option<Self> {
        if per_second > 0.0 && per_second.is_finite() {
            Some(RateLimiter::new(Duration::from_secs_f64(1.0 / per_second)))
        } else {
            None
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!("rate limit: sleeping {:?}", wait);
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// At most `limit` starts within any sliding `window`
#[derive(Debug)]
pub struct WindowLimiter {
    limit: usize,
    window: Duration,
    starts: Mutex<VecDeque<Instant>>,
}

impl WindowLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        WindowLimiter {
            limit: limit.max(1),
            window,
            starts: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn acquire(&self) {
        let mut starts = self.starts.lock().await;
        Self::evict(&mut starts, self.window);

        if starts.len() >= self.limit {
            if let Some(oldest) = starts.front().copied() {
                let wait = self
                    .window
                    .saturating_sub(oldest.elapsed())
                    .saturating_add(Duration::from_millis(10));
                debug!("download window full: sleeping {:?}", wait);
                sleep(wait).await;
                Self::evict(&mut starts, self.window);
            }
        }
        starts.push_back(Instant::now());
    }

    fn evict(starts: &mut VecDeque<Instant>, window: Duration) {
        while let Some(front) = starts.front() {
            if front.elapsed() > window {
                starts.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_second_interval() {
        let limiter = RateLimiter::per_second(5.0).unwrap();
        assert_eq!(limiter.min_interval(), Duration::from_millis(200));
        assert!(RateLimiter::per_second(0.0).is_none());
        assert!(RateLimiter::per_second(-1.0).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(Duration::from_millis(400));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_limiter_blocks_when_full() {
        let limiter = WindowLimiter::new(2, Duration::from_secs(10));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_secs(10));
    }
}
