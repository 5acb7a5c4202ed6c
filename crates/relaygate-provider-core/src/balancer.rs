//! Round-robin credential selection over a provider's credential list.
//!
//! `Balancer::next` advances a single mutex-guarded cursor on every selection
//! attempt — whether or not the attempt is ultimately skipped — and ties are broken
//! by strict list order. A credential is skipped (without resetting the cursor) when
//! it is fail2ban-banned for the requested model, or when the rate limiter refuses an
//! RPM reservation or reports the TPM cap would be exceeded. Once every credential in
//! the list has been tried once, selection gives up.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::fail2ban::Fail2ban;
use crate::rate_limiter::RateLimiter;

#[derive(Debug, Clone)]
pub struct BalancerCredential {
    pub name: String,
    pub enabled: bool,
    pub rpm: i64,
    pub tpm: i64,
    pub is_fallback: bool,
}

impl BalancerCredential {
    pub fn new(name: impl Into<String>, rpm: i64, tpm: i64) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            rpm,
            tpm,
            is_fallback: false,
        }
    }

    pub fn fallback(mut self) -> Self {
        self.is_fallback = true;
        self
    }
}

/// Hook for per-`(credential, model)` availability and rate caps. Disabled by
/// default: when no model checker is installed, `Balancer::next` only consults
/// fail2ban and the credential-level rate limiter.
pub trait ModelChecker: Send + Sync {
    fn has_model(&self, credential: &str, model: &str) -> bool;
    fn rpm_cap(&self, credential: &str, model: &str) -> i64;
    fn tpm_cap(&self, credential: &str, model: &str) -> i64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancerError {
    /// Every credential was banned, disabled, or failed the model check.
    NoCredentialsAvailable,
    /// At least one candidate was skipped purely because of an RPM/TPM limit.
    RateLimitExceeded,
}

pub struct Balancer {
    credentials: Vec<BalancerCredential>,
    cursor: Mutex<usize>,
    fail2ban: Arc<Fail2ban>,
    rate_limiter: Arc<RateLimiter>,
    model_checker: Option<Arc<dyn ModelChecker>>,
}

fn model_key(credential: &str, model: &str) -> String {
    format!("{credential}\u{0}{model}")
}

impl Balancer {
    pub fn new(
        credentials: Vec<BalancerCredential>,
        fail2ban: Arc<Fail2ban>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            credentials,
            cursor: Mutex::new(0),
            fail2ban,
            rate_limiter,
            model_checker: None,
        }
    }

    pub fn with_model_checker(mut self, checker: Arc<dyn ModelChecker>) -> Self {
        self.model_checker = Some(checker);
        self
    }

    pub fn credentials(&self) -> &[BalancerCredential] {
        &self.credentials
    }

    /// Selects the next credential for `model` (pass `None` when the request has no
    /// model-scoped concept, e.g. a passthrough route).
    pub async fn next(&self, model: Option<&str>) -> Result<BalancerCredential, BalancerError> {
        self.select(&self.credentials, model).await
    }

    /// Selects the next fallback-only credential for `model`.
    pub async fn next_fallback(
        &self,
        model: Option<&str>,
    ) -> Result<BalancerCredential, BalancerError> {
        let fallbacks: Vec<BalancerCredential> = self
            .credentials
            .iter()
            .filter(|cred| cred.is_fallback)
            .cloned()
            .collect();
        self.select(&fallbacks, model).await
    }

    async fn select(
        &self,
        pool: &[BalancerCredential],
        model: Option<&str>,
    ) -> Result<BalancerCredential, BalancerError> {
        if pool.is_empty() {
            return Err(BalancerError::NoCredentialsAvailable);
        }

        let mut rate_limited = false;
        let len = self.credentials.len().max(1);
        let mut evaluated = 0usize;

        for _ in 0..len {
            if evaluated >= pool.len() {
                break;
            }
            let index = {
                let mut cursor = self.cursor.lock().await;
                let current = *cursor % len;
                *cursor = (*cursor + 1) % len;
                current
            };

            // The shared cursor walks the full credential list so that distinct
            // fallback/primary pools still observe a consistent rotation, but we only
            // evaluate candidates that are actually in `pool`.
            let Some(cred) = self.credentials.get(index) else {
                continue;
            };
            if !pool.iter().any(|candidate| candidate.name == cred.name) {
                continue;
            }
            evaluated += 1;
            if !cred.enabled {
                continue;
            }

            if let Some(model_id) = model {
                if self.fail2ban.is_banned(&cred.name, model_id).await {
                    continue;
                }
            } else if self.fail2ban.is_banned(&cred.name, "*").await {
                continue;
            }

            let rpm_key = cred.name.clone();
            if !self.rate_limiter.reserve_rpm(&rpm_key, cred.rpm).await {
                rate_limited = true;
                continue;
            }
            if self.rate_limiter.would_exceed_tpm(&rpm_key, cred.tpm).await {
                rate_limited = true;
                continue;
            }

            if let (Some(model_id), Some(checker)) = (model, &self.model_checker) {
                if !checker.has_model(&cred.name, model_id) {
                    continue;
                }
                let scoped_key = model_key(&cred.name, model_id);
                if !self
                    .rate_limiter
                    .reserve_rpm(&scoped_key, checker.rpm_cap(&cred.name, model_id))
                    .await
                {
                    rate_limited = true;
                    continue;
                }
                if self
                    .rate_limiter
                    .would_exceed_tpm(&scoped_key, checker.tpm_cap(&cred.name, model_id))
                    .await
                {
                    rate_limited = true;
                    continue;
                }
            }

            return Ok(cred.clone());
        }

        if rate_limited {
            Err(BalancerError::RateLimitExceeded)
        } else {
            Err(BalancerError::NoCredentialsAvailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fail2ban::Fail2banConfig;

    fn balancer(names: &[&str]) -> Balancer {
        let credentials = names
            .iter()
            .map(|name| BalancerCredential::new(*name, 0, 0))
            .collect();
        Balancer::new(
            credentials,
            Fail2ban::shared(Fail2banConfig::default()),
            RateLimiter::shared(),
        )
    }

    #[tokio::test]
    async fn round_robins_in_strict_list_order() {
        let balancer = balancer(&["A", "B", "C"]);
        let mut picks = Vec::new();
        for _ in 0..6 {
            picks.push(balancer.next(None).await.unwrap().name);
        }
        assert_eq!(picks, vec!["A", "B", "C", "A", "B", "C"]);
    }

    #[tokio::test]
    async fn exhausted_rpm_caps_yield_rate_limit_error() {
        let credentials = vec![
            BalancerCredential::new("A", 1, 0),
            BalancerCredential::new("B", 1, 0),
        ];
        let balancer = Balancer::new(
            credentials,
            Fail2ban::shared(Fail2banConfig::default()),
            RateLimiter::shared(),
        );

        assert_eq!(balancer.next(None).await.unwrap().name, "A");
        assert_eq!(balancer.next(None).await.unwrap().name, "B");
        assert_eq!(
            balancer.next(None).await.unwrap_err(),
            BalancerError::RateLimitExceeded
        );
    }

    #[tokio::test]
    async fn banned_credential_is_skipped() {
        let fail2ban = Fail2ban::shared(Fail2banConfig {
            tracked_codes: vec![429],
            default: crate::fail2ban::Fail2banRule {
                max_attempts: 1,
                ban_duration: tokio::time::Duration::from_secs(60),
            },
            overrides: Default::default(),
        });
        fail2ban.record_response("A", "m", 429).await;

        let balancer = Balancer::new(
            vec![
                BalancerCredential::new("A", 0, 0),
                BalancerCredential::new("B", 0, 0),
            ],
            fail2ban,
            RateLimiter::shared(),
        );

        assert_eq!(balancer.next(Some("m")).await.unwrap().name, "B");
    }

    #[tokio::test]
    async fn no_candidates_is_distinct_from_rate_limited() {
        let balancer = balancer(&[]);
        assert_eq!(
            balancer.next(None).await.unwrap_err(),
            BalancerError::NoCredentialsAvailable
        );
    }
}
