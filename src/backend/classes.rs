use sqlx::Row;

use crate::backend::database::Database;
use crate::backend::live::{ChangeBus, Collection};
use crate::common::error::{PortalError, Result};
use crate::common::models::{Class, Role, Subgroup, User};

#[derive(Debug, Clone)]
pub struct NewClass {
    pub name: String,
    pub instructor_id: String,
    pub schedule: String,
    pub description: Option<String>,
}

async fn load_roster(db: &Database, class_id: &str) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT student_id FROM class_students WHERE class_id = ?")
        .bind(class_id)
        .fetch_all(&db.pool)
        .await?;
    Ok(rows.iter().map(|r| r.get("student_id")).collect())
}

async fn load_subgroups(db: &Database, class_id: &str) -> Result<Vec<Subgroup>> {
    let rows = sqlx::query("SELECT * FROM subgroups WHERE class_id = ?")
        .bind(class_id)
        .fetch_all(&db.pool)
        .await?;
    let mut subgroups = Vec::with_capacity(rows.len());
    for row in rows {
        let id: String = row.get("id");
        let members = sqlx::query("SELECT student_id FROM subgroup_members WHERE subgroup_id = ?")
            .bind(&id)
            .fetch_all(&db.pool)
            .await?
            .iter()
            .map(|r| r.get("student_id"))
            .collect();
        subgroups.push(Subgroup {
            id,
            class_id: row.get("class_id"),
            name: row.get("name"),
            due_date: row.get("due_date"),
            color: row.get("color"),
            last_message: row.get("last_message"),
            members,
        });
    }
    Ok(subgroups)
}

async fn hydrate(db: &Database, row: &sqlx::sqlite::SqliteRow) -> Result<Class> {
    let id: String = row.get("id");
    let enrolled_students = load_roster(db, &id).await?;
    let subgroups = load_subgroups(db, &id).await?;
    Ok(Class {
        id,
        name: row.get("name"),
        instructor_id: row.get("instructor_id"),
        schedule: row.get("schedule"),
        description: row.get("description"),
        enrolled_students,
        subgroups,
        created_at: row.get("created_at"),
    })
}

/// Classes visible to a user. Students see the classes whose roster
/// contains them, professors the ones they teach. An unrecognized role
/// falls back to the unfiltered set, questionable as that is.
pub async fn list_for(db: &Database, user: &User) -> Result<Vec<Class>> {
    let rows = match user.role {
        Role::Student => {
            sqlx::query(
                r#"SELECT c.* FROM classes c
                   JOIN class_students cs ON cs.class_id = c.id
                   WHERE cs.student_id = ?"#,
            )
            .bind(&user.id)
            .fetch_all(&db.pool)
            .await?
        }
        Role::Professor => {
            sqlx::query("SELECT * FROM classes WHERE instructor_id = ?")
                .bind(&user.id)
                .fetch_all(&db.pool)
                .await?
        }
        Role::Unknown => {
            log::warn!(
                "[CLASS] Unrecognized role for user {}, returning all classes",
                user.id
            );
            sqlx::query("SELECT * FROM classes").fetch_all(&db.pool).await?
        }
    };

    let mut classes = Vec::with_capacity(rows.len());
    for row in &rows {
        classes.push(hydrate(db, row).await?);
    }
    Ok(classes)
}

pub async fn get(db: &Database, class_id: &str) -> Result<Class> {
    let row = sqlx::query("SELECT * FROM classes WHERE id = ?")
        .bind(class_id)
        .fetch_optional(&db.pool)
        .await?
        .ok_or_else(|| PortalError::not_found(format!("class {}", class_id)))?;
    hydrate(db, &row).await
}

pub async fn create(db: &Database, bus: &ChangeBus, new_class: NewClass) -> Result<Class> {
    if new_class.name.trim().is_empty() || new_class.instructor_id.trim().is_empty() {
        return Err(PortalError::validation("class name and instructor are required"));
    }
    let id = uuid::Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        "INSERT INTO classes (id, name, instructor_id, schedule, description, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&new_class.name)
    .bind(&new_class.instructor_id)
    .bind(&new_class.schedule)
    .bind(&new_class.description)
    .bind(created_at)
    .execute(&db.pool)
    .await?;
    bus.notify(Collection::Classes);
    log::info!("[CLASS] Created class {} ({})", new_class.name, id);
    Ok(Class {
        id,
        name: new_class.name,
        instructor_id: new_class.instructor_id,
        schedule: new_class.schedule,
        description: new_class.description,
        enrolled_students: Vec::new(),
        subgroups: Vec::new(),
        created_at,
    })
}

pub async fn enroll(db: &Database, bus: &ChangeBus, class_id: &str, student_id: &str) -> Result<()> {
    ensure_exists(db, class_id).await?;
    sqlx::query("INSERT OR IGNORE INTO class_students (class_id, student_id) VALUES (?, ?)")
        .bind(class_id)
        .bind(student_id)
        .execute(&db.pool)
        .await?;
    bus.notify(Collection::Classes);
    Ok(())
}

pub async fn unenroll(db: &Database, bus: &ChangeBus, class_id: &str, student_id: &str) -> Result<()> {
    ensure_exists(db, class_id).await?;
    sqlx::query("DELETE FROM class_students WHERE class_id = ? AND student_id = ?")
        .bind(class_id)
        .bind(student_id)
        .execute(&db.pool)
        .await?;
    bus.notify(Collection::Classes);
    Ok(())
}

pub async fn create_subgroup(
    db: &Database,
    bus: &ChangeBus,
    class_id: &str,
    name: &str,
    due_date: Option<&str>,
    color: Option<&str>,
    members: &[String],
) -> Result<Subgroup> {
    ensure_exists(db, class_id).await?;
    if name.trim().is_empty() {
        return Err(PortalError::validation("subgroup name is required"));
    }
    let id = format!("{}_sg_{}", class_id, uuid::Uuid::new_v4());
    sqlx::query(
        "INSERT INTO subgroups (id, class_id, name, due_date, color, last_message) VALUES (?, ?, ?, ?, ?, NULL)",
    )
    .bind(&id)
    .bind(class_id)
    .bind(name)
    .bind(due_date)
    .bind(color)
    .execute(&db.pool)
    .await?;
    for member in members {
        sqlx::query("INSERT OR IGNORE INTO subgroup_members (subgroup_id, student_id) VALUES (?, ?)")
            .bind(&id)
            .bind(member)
            .execute(&db.pool)
            .await?;
    }
    bus.notify(Collection::Classes);
    log::info!("[CLASS] Created subgroup {} in class {}", name, class_id);
    Ok(Subgroup {
        id,
        class_id: class_id.to_string(),
        name: name.to_string(),
        due_date: due_date.map(str::to_string),
        color: color.map(str::to_string),
        last_message: None,
        members: members.to_vec(),
    })
}

/// Update the subgroup's last-message preview line.
pub async fn update_subgroup_preview(
    db: &Database,
    bus: &ChangeBus,
    subgroup_id: &str,
    last_message: &str,
) -> Result<()> {
    let res = sqlx::query("UPDATE subgroups SET last_message = ? WHERE id = ?")
        .bind(last_message)
        .bind(subgroup_id)
        .execute(&db.pool)
        .await?;
    if res.rows_affected() == 0 {
        return Err(PortalError::not_found(format!("subgroup {}", subgroup_id)));
    }
    bus.notify(Collection::Classes);
    Ok(())
}

async fn ensure_exists(db: &Database, class_id: &str) -> Result<()> {
    let row = sqlx::query("SELECT id FROM classes WHERE id = ?")
        .bind(class_id)
        .fetch_optional(&db.pool)
        .await?;
    if row.is_none() {
        return Err(PortalError::not_found(format!("class {}", class_id)));
    }
    Ok(())
}
