//! Per-key sliding window admission.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Number of tracked keys above which idle keys are swept.
const SWEEP_THRESHOLD: usize = 500;

/// Admits at most `max_hits` per key within any `window`.
pub struct SlidingWindowLimiter {
    max_hits: usize,
    window: Duration,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_hits: usize, window: Duration) -> Self {
        Self {
            max_hits,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Record a hit for `key` and report whether it is admitted. Rejected
    /// hits are not recorded.
    pub fn check(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap_or_else(|e| e.into_inner());

        if hits.len() > SWEEP_THRESHOLD {
            let window = self.window;
            hits.retain(|_, stamps| {
                prune(stamps, now, window);
                !stamps.is_empty()
            });
        }

        let stamps = hits.entry(key.to_string()).or_default();
        prune(stamps, now, self.window);
        if stamps.len() >= self.max_hits {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Keys currently tracked, expired or not.
    pub fn tracked_keys(&self) -> usize {
        self.hits.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn prune(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = stamps.front() {
        if now.duration_since(*oldest) >= window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_limit_per_window() {
        let limiter = SlidingWindowLimiter::new(3, Duration::from_secs(60));

        assert!(limiter.check("+919876543210"));
        assert!(limiter.check("+919876543210"));
        assert!(limiter.check("+919876543210"));
        assert!(!limiter.check("+919876543210"));
        // Other keys are independent
        assert!(limiter.check("+918765432109"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!limiter.check("+919876543210"));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(limiter.check("+919876543210"));
        assert!(limiter.check("+919876543210"));
        assert!(limiter.check("+919876543210"));
        assert!(!limiter.check("+919876543210"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides_per_hit() {
        let limiter = SlidingWindowLimiter::new(2, Duration::from_secs(10));

        assert!(limiter.check("k"));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));

        // First hit leaves the window, second is still inside
        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(limiter.check("k"));
        assert!(!limiter.check("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_keys_are_swept() {
        let limiter = SlidingWindowLimiter::new(1, Duration::from_secs(5));
        for i in 0..=SWEEP_THRESHOLD {
            assert!(limiter.check(&format!("key-{}", i)));
        }
        assert_eq!(limiter.tracked_keys(), SWEEP_THRESHOLD + 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(limiter.check("fresh"));
        assert_eq!(limiter.tracked_keys(), 1);
    }
}
