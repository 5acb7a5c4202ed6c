use std::collections::HashMap;

use relaygate_provider_core::fail2ban::{Fail2ban, Fail2banConfig, Fail2banRule};
use relaygate_provider_core::{Balancer, BalancerCredential, BalancerError, RateLimiter};
use tokio::time::Duration;

fn default_balancer(names: &[&str]) -> Balancer {
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
async fn three_equal_credentials_round_robin_in_order() {
    let balancer = default_balancer(&["A", "B", "C"]);
    let mut picked = Vec::new();
    for _ in 0..6 {
        picked.push(balancer.next(None).await.unwrap().name);
    }
    assert_eq!(picked, vec!["A", "B", "C", "A", "B", "C"]);
}

#[tokio::test]
async fn rpm_cap_of_one_rejects_third_request() {
    let balancer = Balancer::new(
        vec![
            BalancerCredential::new("A", 1, 0),
            BalancerCredential::new("B", 1, 0),
        ],
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
async fn banned_credential_recovers_after_ban_duration() {
    let mut overrides = HashMap::new();
    overrides.insert(
        429,
        Fail2banRule {
            max_attempts: 1,
            ban_duration: Duration::from_millis(100),
        },
    );
    let fail2ban = Fail2ban::shared(Fail2banConfig {
        tracked_codes: vec![429],
        overrides,
        ..Fail2banConfig::default()
    });

    fail2ban.record_response("A", "gpt-5", 429).await;
    assert!(fail2ban.is_banned("A", "gpt-5").await);

    let balancer = Balancer::new(
        vec![
            BalancerCredential::new("A", 0, 0),
            BalancerCredential::new("B", 0, 0),
        ],
        fail2ban.clone(),
        RateLimiter::shared(),
    );
    assert_eq!(balancer.next(Some("gpt-5")).await.unwrap().name, "B");

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(!fail2ban.is_banned("A", "gpt-5").await);
    assert_eq!(balancer.next(Some("gpt-5")).await.unwrap().name, "A");
}

#[tokio::test]
async fn fallback_credentials_are_selected_separately_from_primaries() {
    let credentials = vec![
        BalancerCredential::new("primary", 0, 0),
        BalancerCredential::new("backup", 0, 0).fallback(),
    ];
    let balancer = Balancer::new(
        credentials,
        Fail2ban::shared(Fail2banConfig::default()),
        RateLimiter::shared(),
    );

    assert_eq!(balancer.next_fallback(None).await.unwrap().name, "backup");
}
