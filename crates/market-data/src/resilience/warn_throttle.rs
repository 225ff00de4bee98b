use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Admits at most one log line per interval.
///
/// Used to keep a provider outage from flooding the log: every dashboard
/// request fails the same way while the provider is down.
#[derive(Debug)]
pub struct WarnThrottle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl WarnThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Returns true if the caller should log now, and records that it did.
    pub fn allow(&self) -> bool {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        let now = Instant::now();
        match *last {
            Some(t) if now.duration_since(t) < self.interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl Default for WarnThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
