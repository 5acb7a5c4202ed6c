//! Failure-counting circuit breaker.
//!
//! Tracks upstream response status codes per `(credential, model)` pair and bans the
//! pair once a configured number of tracked failures has been seen. Unlike a plain
//! cooldown, a ban only clears on success, on explicit `unban`, or once its duration
//! (if any) has elapsed — a `ban_duration` of zero is permanent until unbanned by hand.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct Fail2banRule {
    pub max_attempts: u32,
    pub ban_duration: Duration,
}

#[derive(Debug, Clone)]
pub struct Fail2banConfig {
    pub default: Fail2banRule,
    pub tracked_codes: Vec<u16>,
    pub overrides: HashMap<u16, Fail2banRule>,
}

impl Default for Fail2banConfig {
    fn default() -> Self {
        Self {
            default: Fail2banRule {
                max_attempts: 5,
                ban_duration: Duration::from_secs(60),
            },
            tracked_codes: vec![401, 403, 429, 500, 502, 503, 504],
            overrides: HashMap::new(),
        }
    }
}

impl Fail2banConfig {
    fn rule_for(&self, code: u16) -> Fail2banRule {
        self.overrides.get(&code).copied().unwrap_or(self.default)
    }

    fn is_tracked(&self, code: u16) -> bool {
        self.tracked_codes.contains(&code)
    }
}

#[derive(Debug, Clone, Copy)]
struct BanInfo {
    banned_at: Instant,
    ban_duration: Duration,
    triggering_code: u16,
}

impl BanInfo {
    fn is_expired(&self, now: Instant) -> bool {
        if self.ban_duration.is_zero() {
            return false;
        }
        now >= self.banned_at + self.ban_duration
    }
}

#[derive(Debug, Default)]
struct FailureRecord {
    counts: HashMap<u16, u32>,
    ban: Option<BanInfo>,
}

type PairKey = (String, String);

fn key(credential: &str, model: &str) -> PairKey {
    (credential.to_string(), model.to_string())
}

/// Outcome of recording a response against a `(credential, model)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The pair was already banned; the response was ignored.
    Quarantined,
    /// The response cleared or left the pair's failure counts untouched.
    Healthy,
    /// The response incremented a tracked failure count but did not trigger a ban.
    Counting,
    /// This response pushed the pair's tracked count to the ban threshold.
    Banned,
}

pub struct Fail2ban {
    config: Fail2banConfig,
    state: Mutex<HashMap<PairKey, FailureRecord>>,
}

impl Fail2ban {
    pub fn new(config: Fail2banConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared(config: Fail2banConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub async fn record_response(&self, credential: &str, model: &str, status: u16) -> RecordOutcome {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let record = state.entry(key(credential, model)).or_default();

        if let Some(ban) = record.ban {
            if !ban.is_expired(now) {
                return RecordOutcome::Quarantined;
            }
            record.ban = None;
            record.counts.clear();
        }

        if status == 200 {
            record.counts.clear();
            return RecordOutcome::Healthy;
        }

        if !self.config.is_tracked(status) {
            return RecordOutcome::Healthy;
        }

        let count = record.counts.entry(status).or_insert(0);
        *count += 1;
        let rule = self.config.rule_for(status);
        if *count >= rule.max_attempts {
            record.ban = Some(BanInfo {
                banned_at: now,
                ban_duration: rule.ban_duration,
                triggering_code: status,
            });
            return RecordOutcome::Banned;
        }
        RecordOutcome::Counting
    }

    pub async fn is_banned(&self, credential: &str, model: &str) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let Some(record) = state.get_mut(&key(credential, model)) else {
            return false;
        };
        match record.ban {
            Some(ban) if ban.is_expired(now) => {
                record.ban = None;
                record.counts.clear();
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub async fn unban(&self, credential: &str, model: &str) {
        let mut state = self.state.lock().await;
        if let Some(record) = state.get_mut(&key(credential, model)) {
            record.ban = None;
            record.counts.clear();
        }
    }

    pub async fn unban_all_for_credential(&self, credential: &str) {
        let mut state = self.state.lock().await;
        for (pair, record) in state.iter_mut() {
            if pair.0 == credential {
                record.ban = None;
                record.counts.clear();
            }
        }
    }

    pub async fn list_banned_pairs(&self) -> Vec<(String, String, u16)> {
        let now = Instant::now();
        let state = self.state.lock().await;
        state
            .iter()
            .filter_map(|(pair, record)| {
                let ban = record.ban?;
                if ban.is_expired(now) {
                    return None;
                }
                Some((pair.0.clone(), pair.1.clone(), ban.triggering_code))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bans_after_threshold_and_unbans_after_duration() {
        let mut overrides = HashMap::new();
        overrides.insert(
            429,
            Fail2banRule {
                max_attempts: 1,
                ban_duration: Duration::from_millis(100),
            },
        );
        let fail2ban = Fail2ban::new(Fail2banConfig {
            tracked_codes: vec![429],
            overrides,
            ..Fail2banConfig::default()
        });

        let outcome = fail2ban.record_response("A", "m", 429).await;
        assert_eq!(outcome, RecordOutcome::Banned);
        assert!(fail2ban.is_banned("A", "m").await);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!fail2ban.is_banned("A", "m").await);

        // counts cleared: a single further tracked failure should not immediately re-ban.
        let outcome = fail2ban.record_response("A", "m", 429).await;
        assert_eq!(outcome, RecordOutcome::Banned);
    }

    #[tokio::test]
    async fn success_clears_counts_without_banning() {
        let fail2ban = Fail2ban::new(Fail2banConfig::default());
        fail2ban.record_response("A", "m", 500).await;
        fail2ban.record_response("A", "m", 500).await;
        let outcome = fail2ban.record_response("A", "m", 200).await;
        assert_eq!(outcome, RecordOutcome::Healthy);
        assert!(!fail2ban.is_banned("A", "m").await);
    }

    #[tokio::test]
    async fn permanent_ban_requires_manual_unban() {
        let mut overrides = HashMap::new();
        overrides.insert(
            403,
            Fail2banRule {
                max_attempts: 1,
                ban_duration: Duration::ZERO,
            },
        );
        let fail2ban = Fail2ban::new(Fail2banConfig {
            tracked_codes: vec![403],
            overrides,
            ..Fail2banConfig::default()
        });
        fail2ban.record_response("A", "m", 403).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(fail2ban.is_banned("A", "m").await);

        fail2ban.unban("A", "m").await;
        assert!(!fail2ban.is_banned("A", "m").await);
    }

    #[tokio::test]
    async fn unban_all_for_credential_clears_every_model() {
        let mut overrides = HashMap::new();
        overrides.insert(
            429,
            Fail2banRule {
                max_attempts: 1,
                ban_duration: Duration::from_secs(60),
            },
        );
        let fail2ban = Fail2ban::new(Fail2banConfig {
            tracked_codes: vec![429],
            overrides,
            ..Fail2banConfig::default()
        });
        fail2ban.record_response("A", "model-1", 429).await;
        fail2ban.record_response("A", "model-2", 429).await;

        fail2ban.unban_all_for_credential("A").await;
        assert!(!fail2ban.is_banned("A", "model-1").await);
        assert!(!fail2ban.is_banned("A", "model-2").await);
    }

    #[tokio::test]
    async fn non_tracked_status_is_ignored() {
        let fail2ban = Fail2ban::new(Fail2banConfig {
            tracked_codes: vec![429],
            default: Fail2banRule {
                max_attempts: 1,
                ban_duration: Duration::from_secs(60),
            },
            overrides: HashMap::new(),
        });
        fail2ban.record_response("A", "m", 404).await;
        assert!(!fail2ban.is_banned("A", "m").await);
    }
}
