//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use assetdesk_engine::{Caller, ChatResponder, NaturalCrud};
use tokio::sync::Mutex;

use super::RATE_LIMIT_WINDOW_SECS;

/// Per-IP request tracker: (request count, window start time).
type IpTracker = HashMap<IpAddr, (u64, Instant)>;

/// Fixed-window per-IP rate limiter.
pub(crate) struct RateLimiter {
    tracker: Mutex<IpTracker>,
    max_requests: u64,
    window: Duration,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self::with_window(max_requests, Duration::from_secs(RATE_LIMIT_WINDOW_SECS))
    }

    pub(crate) fn with_window(max_requests: u64, window: Duration) -> Self {
        Self {
            tracker: Mutex::new(HashMap::new()),
            max_requests,
            window,
        }
    }

    /// `Err(retry_after_secs)` once `ip` exceeds the window's budget.
    ///
    /// Expired windows are dropped on every call, so the tracker only holds
    /// addresses seen within the last window.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;
        let now = Instant::now();
        let window = self.window;
        tracker.retain(|_, (_, started)| now.duration_since(*started) < window);

        let (count, started) = tracker.entry(ip).or_insert((0, now));
        *count += 1;
        if *count > self.max_requests {
            let elapsed = now.duration_since(*started);
            Err(window.saturating_sub(elapsed).as_secs().max(1))
        } else {
            Ok(())
        }
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.tracker.lock().await.len()
    }
}

pub(crate) struct AppState {
    pub(crate) crud: NaturalCrud,
    pub(crate) chat: ChatResponder,
    /// Session token → caller.
    pub(crate) sessions: HashMap<String, Caller>,
    pub(crate) rate_limiter: RateLimiter,
}

impl AppState {
    pub(crate) fn resolve_session(&self, token: &str) -> Option<Caller> {
        self.sessions.get(token).cloned()
    }
}
