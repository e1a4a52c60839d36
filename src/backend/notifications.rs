use sqlx::Row;

use crate::backend::database::Database;
use crate::backend::live::{ChangeBus, Collection};
use crate::common::error::{PortalError, Result};
use crate::common::models::{Notification, NotificationKind};

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<String>,
}

fn notification_from_row(row: &sqlx::sqlite::SqliteRow) -> Notification {
    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        message: row.get("message"),
        read: row.get::<i64, _>("read") != 0,
        kind: NotificationKind::parse(&row.get::<String, _>("kind")),
        related_id: row.get("related_id"),
        timestamp: row.get("timestamp"),
    }
}

pub async fn for_user(db: &Database, user_id: &str) -> Result<Vec<Notification>> {
    let rows =
        sqlx::query("SELECT * FROM notifications WHERE user_id = ? ORDER BY timestamp DESC")
            .bind(user_id)
            .fetch_all(&db.pool)
            .await?;
    Ok(rows.iter().map(notification_from_row).collect())
}

pub async fn push(db: &Database, bus: &ChangeBus, new: NewNotification) -> Result<Notification> {
    if new.title.trim().is_empty() {
        return Err(PortalError::validation("notification title is required"));
    }
    let id = uuid::Uuid::new_v4().to_string();
    let timestamp = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        r#"INSERT INTO notifications (id, user_id, title, message, read, kind, related_id, timestamp)
           VALUES (?, ?, ?, ?, 0, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&new.user_id)
    .bind(&new.title)
    .bind(&new.message)
    .bind(new.kind.as_str())
    .bind(&new.related_id)
    .bind(timestamp)
    .execute(&db.pool)
    .await?;
    bus.notify(Collection::Notifications);
    Ok(Notification {
        id,
        user_id: new.user_id,
        title: new.title,
        message: new.message,
        read: false,
        kind: new.kind,
        related_id: new.related_id,
        timestamp,
    })
}

pub async fn mark_read(db: &Database, bus: &ChangeBus, notification_id: &str) -> Result<()> {
    let exists = sqlx::query("SELECT id FROM notifications WHERE id = ?")
        .bind(notification_id)
        .fetch_optional(&db.pool)
        .await?;
    if exists.is_none() {
        return Err(PortalError::not_found(format!(
            "notification {}",
            notification_id
        )));
    }
    let res = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND read = 0")
        .bind(notification_id)
        .execute(&db.pool)
        .await?;
    if res.rows_affected() > 0 {
        bus.notify(Collection::Notifications);
    }
    Ok(())
}

/// Returns the number of notifications actually flipped; calling again
/// right away yields 0.
pub async fn mark_all_read(db: &Database, bus: &ChangeBus, user_id: &str) -> Result<u64> {
    let res = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
        .bind(user_id)
        .execute(&db.pool)
        .await?;
    if res.rows_affected() > 0 {
        bus.notify(Collection::Notifications);
    }
    Ok(res.rows_affected())
}
