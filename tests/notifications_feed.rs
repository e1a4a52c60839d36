mod common;

use ateneo::backend::notifications::{self, NewNotification};
use ateneo::client::notifications::NotificationFilter;
use ateneo::common::error::PortalError;
use ateneo::common::models::NotificationKind;

async fn push(portal: &ateneo::Portal, user_id: &str, title: &str) -> String {
    notifications::push(
        &portal.db,
        &portal.bus,
        NewNotification {
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: format!("{} body", title),
            kind: NotificationKind::System,
            related_id: None,
        },
    )
    .await
    .expect("push")
    .id
}

#[tokio::test]
async fn list_filters_by_read_state() {
    let portal = common::portal().await;
    let user = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let feed = portal.notifications(&user.id);

    let first = push(&portal, &user.id, "First").await;
    push(&portal, &user.id, "Second").await;
    // Someone else's notification never shows up here
    push(&portal, "other_user", "Not yours").await;

    assert_eq!(feed.list(NotificationFilter::All).await.expect("all").len(), 2);
    assert_eq!(feed.unread_count().await.expect("unread"), 2);

    feed.mark_read(&first).await.expect("mark");
    let unread = feed.list(NotificationFilter::Unread).await.expect("unread");
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].title, "Second");
    // The full list still has both
    assert_eq!(feed.list(NotificationFilter::All).await.expect("all").len(), 2);
}

#[tokio::test]
async fn mark_read_is_monotonic_and_missing_ids_fail() {
    let portal = common::portal().await;
    let user = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let feed = portal.notifications(&user.id);

    let id = push(&portal, &user.id, "Only").await;
    feed.mark_read(&id).await.expect("first mark");
    // Re-marking an already-read notification stays Ok
    feed.mark_read(&id).await.expect("second mark");
    assert_eq!(feed.unread_count().await.expect("unread"), 0);

    let err = feed.mark_read("missing").await.expect_err("missing id");
    assert!(matches!(err, PortalError::NotFound(_)));
}

#[tokio::test]
async fn mark_all_read_flips_once() {
    let portal = common::portal().await;
    let user = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let feed = portal.notifications(&user.id);

    push(&portal, &user.id, "A").await;
    push(&portal, &user.id, "B").await;
    push(&portal, &user.id, "C").await;

    assert_eq!(feed.mark_all_read().await.expect("mark all"), 3);
    assert_eq!(feed.mark_all_read().await.expect("again"), 0);
    assert_eq!(feed.unread_count().await.expect("unread"), 0);
}

#[tokio::test]
async fn feed_is_ordered_newest_first() {
    let portal = common::portal().await;
    let user = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let feed = portal.notifications(&user.id);

    push(&portal, &user.id, "Older").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    push(&portal, &user.id, "Newer").await;

    let all = feed.list(NotificationFilter::All).await.expect("all");
    assert_eq!(all[0].title, "Newer");
    assert_eq!(all[1].title, "Older");
}
