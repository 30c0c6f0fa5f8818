//! Per-client limits on article generation.
//!
//! A generation holds the request open for the whole crew run and spends
//! model and search quota, so each client IP gets a sliding-window request
//! budget and a cap on generations running at the same time.

use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum generation requests per window.
    pub max_requests: u32,
    pub window: Duration,
    /// Maximum generations running at once per IP.
    pub max_concurrent: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            max_concurrent: 1,
        }
    }
}

#[derive(Debug, Default)]
struct ClientEntry {
    /// Request times within the window, oldest first.
    requests: VecDeque<Instant>,
    running: u32,
}

impl ClientEntry {
    fn prune(&mut self, now: Instant, window: Duration) {
        while self
            .requests
            .front()
            .is_some_and(|t| now.duration_since(*t) >= window)
        {
            self.requests.pop_front();
        }
    }
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Window budget spent; retry after the given time.
    TooManyRequests { retry_after: Duration },
    /// A generation from this client is still running.
    Busy,
}

/// Thread-safe sliding-window limiter.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Mutex<HashMap<IpAddr, ClientEntry>>,
    last_cleanup: RwLock<Instant>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
            last_cleanup: RwLock::new(Instant::now()),
        }
    }

    /// Record a request from `ip` if its window still has room.
    pub fn check_request(&self, ip: IpAddr) -> Result<(), Rejection> {
        self.maybe_cleanup();

        let now = Instant::now();
        let mut entries = self.entries.lock();
        let entry = entries.entry(ip).or_default();
        entry.prune(now, self.config.window);

        if entry.requests.len() >= self.config.max_requests as usize {
            let retry_after = entry
                .requests
                .front()
                .map(|oldest| self.config.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.config.window);
            return Err(Rejection::TooManyRequests { retry_after });
        }

        entry.requests.push_back(now);
        Ok(())
    }

    fn acquire_running(&self, ip: IpAddr) -> bool {
        let mut entries = self.entries.lock();
        let entry = entries.entry(ip).or_default();

        if entry.running >= self.config.max_concurrent {
            return false;
        }

        entry.running += 1;
        true
    }

    fn release_running(&self, ip: IpAddr) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(&ip) {
            entry.running = entry.running.saturating_sub(1);
        }
    }

    /// Drop idle entries every five minutes.
    fn maybe_cleanup(&self) {
        const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

        if self.last_cleanup.read().elapsed() <= CLEANUP_INTERVAL {
            return;
        }

        let mut last = self.last_cleanup.write();
        if last.elapsed() > CLEANUP_INTERVAL {
            let now = Instant::now();
            self.entries.lock().retain(|_, entry| {
                entry.prune(now, self.config.window);
                !entry.requests.is_empty() || entry.running > 0
            });
            *last = now;
        }
    }

    pub fn stats(&self) -> RateLimitStats {
        let entries = self.entries.lock();
        RateLimitStats {
            tracked_ips: entries.len(),
            running_generations: entries.values().map(|e| e.running).sum(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RateLimitStats {
    pub tracked_ips: usize,
    pub running_generations: u32,
}

/// RAII guard for one running generation.
pub struct ConcurrentGuard {
    limiter: Arc<RateLimiter>,
    ip: IpAddr,
}

impl ConcurrentGuard {
    pub fn new(limiter: Arc<RateLimiter>, ip: IpAddr) -> Result<Self, Rejection> {
        if limiter.acquire_running(ip) {
            Ok(Self { limiter, ip })
        } else {
            Err(Rejection::Busy)
        }
    }
}

impl Drop for ConcurrentGuard {
    fn drop(&mut self) {
        self.limiter.release_running(self.ip);
    }
}
