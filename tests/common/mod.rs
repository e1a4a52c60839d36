#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::watch;

use ateneo::backend::auth::NewUser;
use ateneo::backend::config::PortalConfig;
use ateneo::common::models::{Role, User};
use ateneo::Portal;

/// Fresh in-memory portal with a short assistant-reply delay so the
/// delayed-write tests stay fast.
pub async fn portal() -> Portal {
    let config = PortalConfig {
        ai_reply_delay_ms: 100,
        ..PortalConfig::default()
    };
    Portal::open_in_memory(config).await.expect("in-memory portal")
}

pub async fn register_student(portal: &Portal, email: &str, name: &str) -> User {
    portal
        .auth
        .register(NewUser {
            email: email.to_string(),
            password: "password123".to_string(),
            display_name: name.to_string(),
            role: Role::Student,
            photo_url: None,
            major: Some("Computer Science".to_string()),
            year: Some(3),
            department: None,
            office_hours: None,
        })
        .await
        .expect("register student")
}

pub async fn register_professor(portal: &Portal, email: &str, name: &str) -> User {
    portal
        .auth
        .register(NewUser {
            email: email.to_string(),
            password: "password123".to_string(),
            display_name: name.to_string(),
            role: Role::Professor,
            photo_url: None,
            major: None,
            year: None,
            department: Some("Computer Science".to_string()),
            office_hours: Some("Mondays 3-5pm".to_string()),
        })
        .await
        .expect("register professor")
}

/// Wait until `cond` holds, re-checking after every update push.
pub async fn wait_until<F>(rx: &mut watch::Receiver<u64>, mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if cond() {
            return;
        }
        let now = tokio::time::Instant::now();
        let remaining = deadline
            .checked_duration_since(now)
            .expect("condition not met before timeout");
        tokio::time::timeout(remaining, rx.changed())
            .await
            .expect("no update before timeout")
            .expect("updates channel closed");
    }
}

/// Plain polling variant for state without an update channel.
pub async fn poll_until<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met before timeout"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
