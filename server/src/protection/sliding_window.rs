use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{DenyReason, Mode, RequestContext, Rule};

/// Per-client sliding log: at most `max` requests in any trailing `interval`.
#[derive(Clone)]
pub struct SlidingWindow {
    requests: Arc<DashMap<IpAddr, Vec<Instant>>>,
    max: usize,
    interval: Duration,
    mode: Mode,
}

impl SlidingWindow {
    pub fn new(max: usize, interval: Duration, mode: Mode) -> Self {
        Self {
            requests: Arc::new(DashMap::new()),
            max,
            interval,
            mode,
        }
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    pub fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let cutoff = now.checked_sub(self.interval);

        let mut entry = self.requests.entry(ip).or_default();

        // Remove old entries
        if let Some(cutoff) = cutoff {
            entry.retain(|&timestamp| timestamp > cutoff);
        }

        if entry.len() >= self.max {
            return false;
        }

        entry.push(now);
        true
    }

    pub fn cleanup_old_entries(&self) {
        let Some(cutoff) = Instant::now().checked_sub(self.interval) else {
            return;
        };

        self.requests.retain(|_, timestamps| {
            timestamps.retain(|&timestamp| timestamp > cutoff);
            !timestamps.is_empty()
        });
    }

    pub fn tracked_clients(&self) -> usize {
        self.requests.len()
    }
}

impl Rule for SlidingWindow {
    fn name(&self) -> &'static str {
        "sliding_window"
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    fn evaluate(&self, request: &RequestContext) -> Option<DenyReason> {
        if self.check(request.ip) {
            None
        } else {
            Some(DenyReason::RateLimit)
        }
    }

    fn cleanup(&self) {
        self.cleanup_old_entries();
        log::debug!(
            "Rate limiter cleanup: {} clients still tracked",
            self.tracked_clients()
        );
    }
}
