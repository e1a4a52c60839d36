use sqlx::Row;

use crate::backend::database::Database;
use crate::backend::live::{ChangeBus, Collection};
use crate::common::error::{PortalError, Result};
use crate::common::models::{Meeting, MeetingStatus};

#[derive(Debug, Clone)]
pub struct MeetingRequest {
    pub student_id: String,
    pub professor_id: String,
    pub class_id: Option<String>,
    pub date: String,
    pub time: String,
    pub reason: String,
}

fn meeting_from_row(row: &sqlx::sqlite::SqliteRow) -> Meeting {
    Meeting {
        id: row.get("id"),
        student_id: row.get("student_id"),
        professor_id: row.get("professor_id"),
        class_id: row.get("class_id"),
        date: row.get("date"),
        time: row.get("time"),
        reason: row.get("reason"),
        status: MeetingStatus::parse(&row.get::<String, _>("status")),
        response_message: row.get("response_message"),
        created_at: row.get("created_at"),
    }
}

/// File a meeting request. Status is always initialized to pending and
/// the creation timestamp is assigned here, never by the caller.
pub async fn create(db: &Database, bus: &ChangeBus, request: MeetingRequest) -> Result<Meeting> {
    if request.student_id.trim().is_empty()
        || request.professor_id.trim().is_empty()
        || request.date.trim().is_empty()
        || request.time.trim().is_empty()
        || request.reason.trim().is_empty()
    {
        return Err(PortalError::validation(
            "student, professor, date, time and reason are required",
        ));
    }

    let id = uuid::Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        r#"INSERT INTO meetings
           (id, student_id, professor_id, class_id, date, time, reason, status, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', ?)"#,
    )
    .bind(&id)
    .bind(&request.student_id)
    .bind(&request.professor_id)
    .bind(&request.class_id)
    .bind(&request.date)
    .bind(&request.time)
    .bind(&request.reason)
    .bind(created_at)
    .execute(&db.pool)
    .await?;

    bus.notify(Collection::Meetings);
    log::info!(
        "[MEET] Meeting {} requested by {} with {}",
        id,
        request.student_id,
        request.professor_id
    );

    Ok(Meeting {
        id,
        student_id: request.student_id,
        professor_id: request.professor_id,
        class_id: request.class_id,
        date: request.date,
        time: request.time,
        reason: request.reason,
        status: MeetingStatus::Pending,
        response_message: None,
        created_at,
    })
}

pub async fn list_for_student(db: &Database, student_id: &str) -> Result<Vec<Meeting>> {
    let rows =
        sqlx::query("SELECT * FROM meetings WHERE student_id = ? ORDER BY created_at DESC")
            .bind(student_id)
            .fetch_all(&db.pool)
            .await?;
    Ok(rows.iter().map(meeting_from_row).collect())
}

pub async fn list_for_professor(db: &Database, professor_id: &str) -> Result<Vec<Meeting>> {
    let rows =
        sqlx::query("SELECT * FROM meetings WHERE professor_id = ? ORDER BY created_at DESC")
            .bind(professor_id)
            .fetch_all(&db.pool)
            .await?;
    Ok(rows.iter().map(meeting_from_row).collect())
}

pub async fn get(db: &Database, meeting_id: &str) -> Result<Meeting> {
    let row = sqlx::query("SELECT * FROM meetings WHERE id = ?")
        .bind(meeting_id)
        .fetch_optional(&db.pool)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("meeting {}", meeting_id)))?;
    Ok(meeting_from_row(&row))
}

/// Apply a professor's decision. Re-applying a decision is allowed
/// (last write wins). There is no check that the caller is the addressed
/// professor; that authorization boundary, if wanted, lives above this
/// layer.
pub async fn transition(
    db: &Database,
    bus: &ChangeBus,
    meeting_id: &str,
    status: MeetingStatus,
    response_message: Option<&str>,
) -> Result<()> {
    if status == MeetingStatus::Pending {
        return Err(PortalError::validation(
            "a meeting can only be transitioned to accepted or rejected",
        ));
    }

    let res = match response_message {
        Some(message) => {
            sqlx::query("UPDATE meetings SET status = ?, response_message = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(message)
                .bind(meeting_id)
                .execute(&db.pool)
                .await?
        }
        None => {
            sqlx::query("UPDATE meetings SET status = ? WHERE id = ?")
                .bind(status.as_str())
                .bind(meeting_id)
                .execute(&db.pool)
                .await?
        }
    };
    if res.rows_affected() == 0 {
        return Err(PortalError::not_found(format!("meeting {}", meeting_id)));
    }

    bus.notify(Collection::Meetings);
    log::info!("[MEET] Meeting {} -> {}", meeting_id, status.as_str());
    Ok(())
}

pub async fn delete(db: &Database, bus: &ChangeBus, meeting_id: &str) -> Result<()> {
    let res = sqlx::query("DELETE FROM meetings WHERE id = ?")
        .bind(meeting_id)
        .execute(&db.pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(PortalError::not_found(format!("meeting {}", meeting_id)));
    }
    bus.notify(Collection::Meetings);
    log::info!("[MEET] Meeting {} deleted", meeting_id);
    Ok(())
}
