use ateneo::backend::config::PortalConfig;
use ateneo::backend::database::Database;
use sqlx::Row;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = PortalConfig::from_env();
    println!("Connecting to {}", config.database_url);
    let db = Database::connect(&config.database_url).await?;

    println!("\n-- collection counts --");
    for table in [
        "users",
        "classes",
        "meetings",
        "chats",
        "messages",
        "notifications",
        "sessions",
    ] {
        let row = sqlx::query(&format!("SELECT COUNT(1) AS c FROM {}", table))
            .fetch_one(&db.pool)
            .await?;
        let count: i64 = row.try_get("c").unwrap_or(0);
        println!("{}={}", table, count);
    }

    println!("\n-- users --");
    let rows = sqlx::query("SELECT id, email, display_name, role, last_active FROM users")
        .fetch_all(&db.pool)
        .await?;
    for r in rows.iter() {
        let id: String = r.try_get("id").unwrap_or_default();
        let email: String = r.try_get("email").unwrap_or_default();
        let display_name: String = r.try_get("display_name").unwrap_or_default();
        let role: String = r.try_get("role").unwrap_or_default();
        let last_active: i64 = r.try_get("last_active").unwrap_or(0);
        println!(
            "id={} email={} name={} role={} last_active={}",
            id, email, display_name, role, last_active
        );
    }

    println!("\n-- meetings --");
    let rows = sqlx::query(
        "SELECT id, student_id, professor_id, date, time, status, created_at FROM meetings ORDER BY created_at DESC",
    )
    .fetch_all(&db.pool)
    .await?;
    for r in rows.iter() {
        let id: String = r.try_get("id").unwrap_or_default();
        let student_id: String = r.try_get("student_id").unwrap_or_default();
        let professor_id: String = r.try_get("professor_id").unwrap_or_default();
        let date: String = r.try_get("date").unwrap_or_default();
        let time: String = r.try_get("time").unwrap_or_default();
        let status: String = r.try_get("status").unwrap_or_default();
        println!(
            "id={} student={} professor={} slot={} {} status={}",
            id, student_id, professor_id, date, time, status
        );
    }

    println!("\n-- chats --");
    let rows = sqlx::query("SELECT id, kind, group_name, last_text, last_timestamp FROM chats")
        .fetch_all(&db.pool)
        .await?;
    for r in rows.iter() {
        let id: String = r.try_get("id").unwrap_or_default();
        let kind: String = r.try_get("kind").unwrap_or_default();
        let group_name: String = r.try_get("group_name").unwrap_or_default();
        let last_text: String = r.try_get("last_text").unwrap_or_default();
        let last_timestamp: i64 = r.try_get("last_timestamp").unwrap_or(0);
        println!(
            "id={} kind={} group_name={} last_len={} last_ts={}",
            id,
            kind,
            group_name,
            last_text.len(),
            last_timestamp
        );
    }

    println!("\n-- messages (last 10) --");
    let rows = sqlx::query(
        "SELECT id, chat_id, sender_id, text, timestamp, read FROM messages ORDER BY timestamp DESC LIMIT 10",
    )
    .fetch_all(&db.pool)
    .await?;
    for r in rows.iter() {
        let id: String = r.try_get("id").unwrap_or_default();
        let chat_id: String = r.try_get("chat_id").unwrap_or_default();
        let sender_id: String = r.try_get("sender_id").unwrap_or_default();
        let text: String = r.try_get("text").unwrap_or_default();
        let timestamp: i64 = r.try_get("timestamp").unwrap_or(0);
        let read: i64 = r.try_get("read").unwrap_or(0);
        println!(
            "id={} chat_id={} sender={} text_len={} ts={} read={}",
            id,
            chat_id,
            sender_id,
            text.len(),
            timestamp,
            read
        );
    }

    Ok(())
}
