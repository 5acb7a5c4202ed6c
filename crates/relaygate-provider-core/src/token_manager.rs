//! OAuth2 access-token cache with single-flight refresh coalescing.
//!
//! Many concurrent callers asking for the same credential's token while it is
//! expired must trigger exactly one upstream refresh, not one per caller. The first
//! caller to find no refresh in flight registers a single-slot reply channel for
//! itself, spawns the refresh, and becomes responsible for broadcasting the result;
//! every later caller for the same credential appends its own channel to the same
//! waiter list instead of spawning another refresh.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, oneshot};
use tokio::time::Duration;

const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: std::time::SystemTime,
}

impl CachedToken {
    fn is_expiring(&self, skew: Duration) -> bool {
        match self.expires_at.duration_since(std::time::SystemTime::now()) {
            Ok(remaining) => remaining < skew,
            Err(_) => true,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    #[error("token refresh timed out")]
    RefreshTimeout,
    #[error("token manager stopped")]
    Stopped,
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),
}

type Waiter = oneshot::Sender<Result<CachedToken, TokenError>>;

pub struct TokenManager {
    tokens: Arc<Mutex<HashMap<String, CachedToken>>>,
    refreshing: Arc<Mutex<HashMap<String, Vec<Waiter>>>>,
    refresh_skew: Duration,
    stopped: AtomicBool,
}

impl Default for TokenManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenManager {
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
            refreshing: Arc::new(Mutex::new(HashMap::new())),
            refresh_skew: Duration::from_secs(60),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Returns a cached, non-expiring token for `credential_name`, coalescing
    /// concurrent refreshes behind a single call to `refresh`.
    ///
    /// `refresh` is only ever invoked by the caller that wins the race to start a
    /// refresh; all other concurrent callers receive the winner's result.
    pub async fn get_token<F, Fut>(
        &self,
        credential_name: &str,
        refresh: F,
    ) -> Result<CachedToken, TokenError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<CachedToken, TokenError>> + Send + 'static,
    {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(TokenError::Stopped);
        }

        {
            let tokens = self.tokens.lock().await;
            if let Some(cached) = tokens.get(credential_name) {
                if !cached.is_expiring(self.refresh_skew) {
                    return Ok(cached.clone());
                }
            }
        }

        let (tx, rx) = oneshot::channel();
        let should_spawn = {
            let mut refreshing = self.refreshing.lock().await;
            match refreshing.get_mut(credential_name) {
                Some(waiters) => {
                    waiters.push(tx);
                    false
                }
                None => {
                    refreshing.insert(credential_name.to_string(), vec![tx]);
                    true
                }
            }
        };

        if should_spawn {
            self.spawn_refresh(credential_name.to_string(), refresh);
        }

        match tokio::time::timeout(REFRESH_TIMEOUT, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TokenError::RefreshFailed(
                "refresh worker dropped its reply channel".to_string(),
            )),
            Err(_) => {
                let mut refreshing = self.refreshing.lock().await;
                refreshing.remove(credential_name);
                Err(TokenError::RefreshTimeout)
            }
        }
    }

    fn spawn_refresh<F, Fut>(&self, credential_name: String, refresh: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<CachedToken, TokenError>> + Send + 'static,
    {
        let tokens = self.tokens.clone();
        let refreshing = self.refreshing.clone();

        tokio::spawn(async move {
            let result = match tokio::spawn(refresh()).await {
                Ok(result) => result,
                Err(join_error) => Err(TokenError::RefreshFailed(format!(
                    "refresh task panicked: {join_error}"
                ))),
            };

            if let Ok(ref cached) = result {
                let mut tokens = tokens.lock().await;
                tokens.insert(credential_name.clone(), cached.clone());
            }

            let waiters = {
                let mut refreshing = refreshing.lock().await;
                refreshing.remove(&credential_name).unwrap_or_default()
            };
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        });
    }

    /// Marks the manager stopped and fails every in-flight waiter. New calls to
    /// `get_token` return `TokenError::Stopped` immediately.
    pub async fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let mut refreshing = self.refreshing.lock().await;
        for (_, waiters) in refreshing.drain() {
            for waiter in waiters {
                let _ = waiter.send(Err(TokenError::Stopped));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn concurrent_callers_coalesce_into_one_refresh() {
        let manager = TokenManager::shared();
        let refresh_count = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let manager = manager.clone();
            let refresh_count = refresh_count.clone();
            handles.push(tokio::spawn(async move {
                manager
                    .get_token("svc-account", move || {
                        let refresh_count = refresh_count.clone();
                        async move {
                            refresh_count.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(CachedToken {
                                access_token: "tok-1".to_string(),
                                expires_at: std::time::SystemTime::now()
                                    + Duration::from_secs(3600),
                            })
                        }
                    })
                    .await
            }));
        }

        let mut tokens = Vec::new();
        for handle in handles {
            tokens.push(handle.await.unwrap().unwrap().access_token);
        }

        assert!(tokens.iter().all(|token| token == "tok-1"));
        let refreshes = refresh_count.load(Ordering::SeqCst);
        assert!(refreshes <= 2, "expected at most two upstream refreshes, got {refreshes}");
    }

    #[tokio::test]
    async fn cached_non_expiring_token_skips_refresh() {
        let manager = TokenManager::shared();
        let refresh_count = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let refresh_count = refresh_count.clone();
            let token = manager
                .get_token("svc-account", move || async move {
                    refresh_count.fetch_add(1, Ordering::SeqCst);
                    Ok(CachedToken {
                        access_token: "tok-1".to_string(),
                        expires_at: std::time::SystemTime::now() + Duration::from_secs(3600),
                    })
                })
                .await
                .unwrap();
            assert_eq!(token.access_token, "tok-1");
        }

        assert_eq!(refresh_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_fails_in_flight_waiters() {
        let manager = TokenManager::shared();
        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        let manager_clone = manager.clone();
        let handle = tokio::spawn(async move {
            manager_clone
                .get_token("svc-account", move || async move {
                    let _ = ready_tx.send(());
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(CachedToken {
                        access_token: "tok-1".to_string(),
                        expires_at: std::time::SystemTime::now() + Duration::from_secs(3600),
                    })
                })
                .await
        });

        ready_rx.await.unwrap();
        manager.stop().await;
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(TokenError::Stopped)));
    }
}
