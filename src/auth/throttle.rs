//! Per-IP login attempt counter.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Attempts {
    count: u32,
    window_start: Instant,
}

/// Rejects logins from an address once it has used `max_failures` attempts
/// inside `window`. The window starts at the first attempt.
///
/// An attempt is counted when it is admitted, before the password check, so
/// concurrent requests cannot all slip past the limit. A successful login
/// clears the address; a request that failed for reasons other than the
/// credentials hands its attempt back.
#[derive(Clone)]
pub struct LoginThrottle {
    max_failures: u32,
    window: Duration,
    attempts: Arc<Mutex<HashMap<IpAddr, Attempts>>>,
}

impl LoginThrottle {
    pub fn new(max_failures: u32, window: Duration) -> Self {
        Self {
            max_failures,
            window,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check and count one attempt under a single lock. `false` means the
    /// address is over its limit and the attempt was not counted.
    pub async fn try_begin(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut attempts = self.attempts.lock().await;
        // Evict finished windows so the map tracks only active addresses.
        attempts.retain(|_, a| now.duration_since(a.window_start) < self.window);

        let entry = attempts.entry(ip).or_insert(Attempts {
            count: 0,
            window_start: now,
        });
        if entry.count >= self.max_failures {
            return false;
        }
        entry.count += 1;
        if entry.count == self.max_failures {
            tracing::warn!(ip = %ip, "Login attempts exhausted for this window");
        }
        true
    }

    /// Give back an attempt that never reached a credential check outcome.
    pub async fn release(&self, ip: IpAddr) {
        let mut attempts = self.attempts.lock().await;
        if let Some(entry) = attempts.get_mut(&ip) {
            entry.count = entry.count.saturating_sub(1);
        }
    }

    pub async fn record_success(&self, ip: IpAddr) {
        self.attempts.lock().await.remove(&ip);
    }
}
