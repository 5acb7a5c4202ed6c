//! Sliding-window request and token rate limiting, per credential and per
//! `(credential, model)` pair.
//!
//! RPM uses a rolling 60-second window of request timestamps: a reservation is
//! admitted only if fewer than `cap` requests remain in the window, and the
//! reservation itself is monotonic — it is not rolled back if a later predicate in
//! the balancer's selection chain rejects the same attempt. TPM is a decaying
//! accumulator of tokens charged in the same window; charges are never rejected,
//! only reported as "would exceed" to the caller.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct Window {
    rpm_entries: Vec<Instant>,
    tpm_entries: Vec<(Instant, u64)>,
}

impl Window {
    fn evict(&mut self, now: Instant) {
        self.rpm_entries.retain(|at| now.duration_since(*at) < WINDOW);
        self.tpm_entries.retain(|(at, _)| now.duration_since(*at) < WINDOW);
    }

    fn rpm_sum(&self) -> usize {
        self.rpm_entries.len()
    }

    fn tpm_sum(&self) -> u64 {
        self.tpm_entries.iter().map(|(_, tokens)| tokens).sum()
    }
}

pub struct RateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Registers a key ahead of time. Not required — windows are created lazily on
    /// first use — but useful for pre-seeding `currentRPM`/`currentTPM` dashboards.
    pub async fn register_key(&self, key: &str) {
        let mut windows = self.windows.lock().await;
        windows.entry(key.to_string()).or_default();
    }

    /// Reserves one RPM slot for `key` if the 60-second window has room under `cap`.
    /// `cap <= 0` means unlimited. The reservation is recorded unconditionally on
    /// success and is never retracted by a later failed predicate.
    pub async fn reserve_rpm(&self, key: &str, cap: i64) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_default();
        window.evict(now);

        if cap <= 0 {
            window.rpm_entries.push(now);
            return true;
        }
        if (window.rpm_sum() as i64) < cap {
            window.rpm_entries.push(now);
            true
        } else {
            false
        }
    }

    /// Unconditionally charges `tokens` against `key`'s TPM window.
    pub async fn charge_tpm(&self, key: &str, tokens: u64) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_default();
        window.evict(now);
        window.tpm_entries.push((now, tokens));
    }

    /// Reports whether `key`'s current TPM sum has already reached `cap`.
    /// `cap <= 0` means unlimited.
    pub async fn would_exceed_tpm(&self, key: &str, cap: i64) -> bool {
        if cap <= 0 {
            return false;
        }
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_default();
        window.evict(now);
        window.tpm_sum() as i64 >= cap
    }

    pub async fn current_rpm(&self, key: &str) -> u64 {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_default();
        window.evict(now);
        window.rpm_sum() as u64
    }

    pub async fn current_tpm(&self, key: &str) -> u64 {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(key.to_string()).or_default();
        window.evict(now);
        window.tpm_sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserve_rpm_admits_up_to_cap_then_rejects() {
        let limiter = RateLimiter::new();
        assert!(limiter.reserve_rpm("A", 1).await);
        assert!(!limiter.reserve_rpm("A", 1).await);
    }

    #[tokio::test]
    async fn unlimited_cap_never_rejects() {
        let limiter = RateLimiter::new();
        for _ in 0..100 {
            assert!(limiter.reserve_rpm("A", 0).await);
        }
    }

    #[tokio::test]
    async fn tpm_charge_is_unconditional_but_exceed_check_reports_it() {
        let limiter = RateLimiter::new();
        assert!(!limiter.would_exceed_tpm("A", 100).await);
        limiter.charge_tpm("A", 150).await;
        assert!(limiter.would_exceed_tpm("A", 100).await);
        assert_eq!(limiter.current_tpm("A").await, 150);
    }

    #[tokio::test]
    async fn per_key_windows_are_independent() {
        let limiter = RateLimiter::new();
        assert!(limiter.reserve_rpm("A", 1).await);
        assert!(limiter.reserve_rpm("B", 1).await);
        assert!(!limiter.reserve_rpm("A", 1).await);
    }
}
