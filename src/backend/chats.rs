use sqlx::Row;

use crate::backend::config::PortalConfig;
use crate::backend::database::Database;
use crate::backend::live::{ChangeBus, Collection};
use crate::common::error::{PortalError, Result};
use crate::common::models::{Chat, ChatKind, LastMessage, Message};

async fn load_participants(db: &Database, chat_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT user_id FROM chat_participants WHERE chat_id = ?")
        .bind(chat_id)
        .fetch_all(&db.pool)
        .await?;
    Ok(rows.iter().map(|r| r.get("user_id")).collect())
}

async fn chat_from_row(db: &Database, row: &sqlx::sqlite::SqliteRow) -> Result<Chat> {
    let id: String = row.get("id");
    let participants = load_participants(db, &id).await?;
    let last_message = match row.get::<Option<i64>, _>("last_timestamp") {
        Some(timestamp) => Some(LastMessage {
            sender_id: row.get::<Option<String>, _>("last_sender_id").unwrap_or_default(),
            text: row.get::<Option<String>, _>("last_text").unwrap_or_default(),
            timestamp,
        }),
        None => None,
    };
    Ok(Chat {
        id,
        participants,
        kind: ChatKind::parse(&row.get::<String, _>("kind")),
        group_name: row.get("group_name"),
        class_id: row.get("class_id"),
        last_message,
        created_at: row.get("created_at"),
    })
}

fn message_from_row(row: &sqlx::sqlite::SqliteRow) -> Message {
    Message {
        id: row.get("id"),
        chat_id: row.get("chat_id"),
        sender_id: row.get("sender_id"),
        text: row.get("text"),
        timestamp: row.get("timestamp"),
        read: row.get::<i64, _>("read") != 0,
    }
}

pub async fn create_chat(
    db: &Database,
    bus: &ChangeBus,
    participants: &[String],
    kind: ChatKind,
    group_name: Option<&str>,
    class_id: Option<&str>,
) -> Result<Chat> {
    if participants.len() < 2 {
        return Err(PortalError::validation("a chat needs at least two participants"));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().timestamp_millis();
    let group_name = match kind {
        ChatKind::Group => group_name,
        _ => None,
    };

    let mut tx = db.pool.begin().await?;
    sqlx::query(
        "INSERT INTO chats (id, kind, group_name, class_id, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(kind.as_str())
    .bind(group_name)
    .bind(class_id)
    .bind(created_at)
    .execute(&mut *tx)
    .await?;
    for participant in participants {
        sqlx::query("INSERT OR IGNORE INTO chat_participants (chat_id, user_id) VALUES (?, ?)")
            .bind(&id)
            .bind(participant)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    bus.notify(Collection::Chats);
    log::info!("[CHAT] Created {} chat {}", kind.as_str(), id);

    Ok(Chat {
        id,
        participants: participants.to_vec(),
        kind,
        group_name: group_name.map(str::to_string),
        class_id: class_id.map(str::to_string),
        last_message: None,
        created_at,
    })
}

/// Every conversation the user participates in. Unordered; the client
/// sorts by last-message recency, which is presentation state.
pub async fn chats_for_user(db: &Database, user_id: &str) -> Result<Vec<Chat>> {
    let rows = sqlx::query(
        r#"SELECT c.* FROM chats c
           JOIN chat_participants p ON p.chat_id = c.id
           WHERE p.user_id = ?"#,
    )
    .bind(user_id)
    .fetch_all(&db.pool)
    .await?;
    let mut chats = Vec::with_capacity(rows.len());
    for row in &rows {
        chats.push(chat_from_row(db, row).await?);
    }
    Ok(chats)
}

pub async fn get_chat(db: &Database, chat_id: &str) -> Result<Chat> {
    let row = sqlx::query("SELECT * FROM chats WHERE id = ?")
        .bind(chat_id)
        .fetch_optional(&db.pool)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("chat {}", chat_id)))?;
    chat_from_row(db, &row).await
}

/// Append one message. The chat's denormalized preview is NOT touched
/// here; callers pair this with `update_last_message`, accepting the
/// non-transactional gap between the two writes.
pub async fn append_message(
    db: &Database,
    bus: &ChangeBus,
    config: &PortalConfig,
    chat_id: &str,
    sender_id: &str,
    text: &str,
    read: bool,
) -> Result<Message> {
    let text = text.trim();
    if text.is_empty() {
        return Err(PortalError::validation("message text is empty"));
    }
    if text.len() > config.max_message_length {
        return Err(PortalError::validation(format!(
            "message too long (max {} chars)",
            config.max_message_length
        )));
    }

    let exists = sqlx::query("SELECT id FROM chats WHERE id = ?")
        .bind(chat_id)
        .fetch_optional(&db.pool)
        .await?;
    if exists.is_none() {
        return Err(PortalError::not_found(format!("chat {}", chat_id)));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let timestamp = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        "INSERT INTO messages (id, chat_id, sender_id, text, timestamp, read) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(chat_id)
    .bind(sender_id)
    .bind(text)
    .bind(timestamp)
    .bind(read as i64)
    .execute(&db.pool)
    .await?;

    bus.notify(Collection::Messages);

    Ok(Message {
        id,
        chat_id: chat_id.to_string(),
        sender_id: sender_id.to_string(),
        text: text.to_string(),
        timestamp,
        read,
    })
}

/// Refresh the chat-list preview after an append.
pub async fn update_last_message(
    db: &Database,
    bus: &ChangeBus,
    chat_id: &str,
    sender_id: &str,
    text: &str,
    timestamp: i64,
) -> Result<()> {
    let res = sqlx::query(
        "UPDATE chats SET last_sender_id = ?, last_text = ?, last_timestamp = ? WHERE id = ?",
    )
    .bind(sender_id)
    .bind(text)
    .bind(timestamp)
    .bind(chat_id)
    .execute(&db.pool)
    .await?;
    if res.rows_affected() == 0 {
        return Err(PortalError::not_found(format!("chat {}", chat_id)));
    }
    bus.notify(Collection::Chats);
    Ok(())
}

/// Ascending store-assigned order; ties broken by id so the order is
/// stable across refreshes.
pub async fn messages_for_chat(db: &Database, chat_id: &str) -> Result<Vec<Message>> {
    let rows = sqlx::query("SELECT * FROM messages WHERE chat_id = ? ORDER BY timestamp ASC, id ASC")
        .bind(chat_id)
        .fetch_all(&db.pool)
        .await?;
    Ok(rows.iter().map(message_from_row).collect())
}

/// Flip the read flag, false -> true only. Returns whether a flip
/// actually happened, so callers can count real writes.
pub async fn mark_message_read(db: &Database, bus: &ChangeBus, message_id: &str) -> Result<bool> {
    let res = sqlx::query("UPDATE messages SET read = 1 WHERE id = ? AND read = 0")
        .bind(message_id)
        .execute(&db.pool)
        .await?;
    let flipped = res.rows_affected() > 0;
    if flipped {
        bus.notify(Collection::Messages);
    }
    Ok(flipped)
}

/// Unread messages authored by someone other than the viewer.
pub async fn unread_count(db: &Database, chat_id: &str, viewer_id: &str) -> Result<i64> {
    let row = sqlx::query(
        "SELECT COUNT(1) AS c FROM messages WHERE chat_id = ? AND sender_id != ? AND read = 0",
    )
    .bind(chat_id)
    .bind(viewer_id)
    .fetch_one(&db.pool)
    .await?;
    Ok(row.get("c"))
}
