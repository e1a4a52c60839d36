//! Demonstration data: one professor, a small student roster, classes
//! with subgroups, meetings in every status, AI/direct/group chats with
//! history, and a batch of notifications. Seeding clears first, so the
//! operation is idempotent by intent.

use crate::backend::auth::{AuthService, NewUser};
use crate::backend::database::Database;
use crate::backend::live::{ChangeBus, Collection};
use crate::common::error::Result;
use crate::common::models::{Role, AI_ASSISTANT};

pub const DEMO_PASSWORD: &str = "password123";

#[derive(Debug, Default)]
pub struct SeedSummary {
    pub users: usize,
    pub classes: usize,
    pub meetings: usize,
    pub chats: usize,
    pub messages: usize,
    pub notifications: usize,
}

fn days_ago_ms(days: i64) -> i64 {
    chrono::Utc::now().timestamp_millis() - days * 24 * 60 * 60 * 1000
}

/// Delete every document in every collection, identity substrate
/// included.
pub async fn clear_all(db: &Database, bus: &ChangeBus) -> Result<()> {
    for table in [
        "sessions",
        "session_events",
        "auth",
        "users",
        "class_students",
        "subgroup_members",
        "subgroups",
        "classes",
        "meetings",
        "chat_participants",
        "chats",
        "messages",
        "notifications",
    ] {
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&db.pool)
            .await?;
    }
    for collection in [
        Collection::Users,
        Collection::Classes,
        Collection::Meetings,
        Collection::Chats,
        Collection::Messages,
        Collection::Notifications,
    ] {
        bus.notify(collection);
    }
    log::info!("[SEED] Cleared all collections");
    Ok(())
}

async fn insert_class(
    db: &Database,
    id: &str,
    name: &str,
    instructor_id: &str,
    schedule: &str,
    students: &[&String],
) -> Result<()> {
    sqlx::query(
        "INSERT INTO classes (id, name, instructor_id, schedule, description, created_at) VALUES (?, ?, ?, ?, NULL, ?)",
    )
    .bind(id)
    .bind(name)
    .bind(instructor_id)
    .bind(schedule)
    .bind(days_ago_ms(60))
    .execute(&db.pool)
    .await?;
    for student in students {
        sqlx::query("INSERT OR IGNORE INTO class_students (class_id, student_id) VALUES (?, ?)")
            .bind(id)
            .bind(student.as_str())
            .execute(&db.pool)
            .await?;
    }
    Ok(())
}

async fn insert_meeting(
    db: &Database,
    id: &str,
    student_id: &str,
    professor_id: &str,
    class_id: &str,
    date: &str,
    time: &str,
    reason: &str,
    status: &str,
    response: Option<&str>,
    created_days_ago: i64,
) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO meetings
           (id, student_id, professor_id, class_id, date, time, reason, status, response_message, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(id)
    .bind(student_id)
    .bind(professor_id)
    .bind(class_id)
    .bind(date)
    .bind(time)
    .bind(reason)
    .bind(status)
    .bind(response)
    .bind(days_ago_ms(created_days_ago))
    .execute(&db.pool)
    .await?;
    Ok(())
}

async fn insert_chat(
    db: &Database,
    id: &str,
    kind: &str,
    group_name: Option<&str>,
    class_id: Option<&str>,
    participants: &[&str],
    created_days_ago: i64,
) -> Result<()> {
    sqlx::query("INSERT INTO chats (id, kind, group_name, class_id, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id)
        .bind(kind)
        .bind(group_name)
        .bind(class_id)
        .bind(days_ago_ms(created_days_ago))
        .execute(&db.pool)
        .await?;
    for participant in participants {
        sqlx::query("INSERT OR IGNORE INTO chat_participants (chat_id, user_id) VALUES (?, ?)")
            .bind(id)
            .bind(participant)
            .execute(&db.pool)
            .await?;
    }
    Ok(())
}

/// Appends a message and keeps the chat preview in step, the way live
/// sends do.
async fn insert_message(
    db: &Database,
    chat_id: &str,
    sender_id: &str,
    text: &str,
    days_ago: i64,
    read: bool,
) -> Result<()> {
    let timestamp = days_ago_ms(days_ago);
    sqlx::query(
        "INSERT INTO messages (id, chat_id, sender_id, text, timestamp, read) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(chat_id)
    .bind(sender_id)
    .bind(text)
    .bind(timestamp)
    .bind(read as i64)
    .execute(&db.pool)
    .await?;
    sqlx::query(
        "UPDATE chats SET last_sender_id = ?, last_text = ?, last_timestamp = ? WHERE id = ? AND (last_timestamp IS NULL OR last_timestamp < ?)",
    )
    .bind(sender_id)
    .bind(text)
    .bind(timestamp)
    .bind(chat_id)
    .bind(timestamp)
    .execute(&db.pool)
    .await?;
    Ok(())
}

async fn insert_notification(
    db: &Database,
    id: &str,
    user_id: &str,
    title: &str,
    message: &str,
    kind: &str,
    related_id: Option<&str>,
    read: bool,
    days_ago: i64,
) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO notifications (id, user_id, title, message, read, kind, related_id, timestamp)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(read as i64)
    .bind(kind)
    .bind(related_id)
    .bind(days_ago_ms(days_ago))
    .execute(&db.pool)
    .await?;
    Ok(())
}

/// Clear, then populate all six collections with the demo cast. Users go
/// through the identity provider so their passwords actually work; the
/// historical records (meetings, chats, messages, notifications) are
/// written directly with back-dated timestamps, as an administrative
/// process does.
pub async fn seed_all(db: &Database, bus: &ChangeBus, auth: &AuthService) -> Result<SeedSummary> {
    clear_all(db, bus).await?;

    let mut summary = SeedSummary::default();

    let professor = auth
        .register(NewUser {
            email: "cllorente@faculty.ie.edu".into(),
            password: DEMO_PASSWORD.into(),
            display_name: "Professor Carlos Llorente".into(),
            role: Role::Professor,
            photo_url: None,
            major: None,
            year: None,
            department: Some("Computer Science".into()),
            office_hours: Some("Mondays 3-5pm, Thursdays 2-4pm".into()),
        })
        .await?;

    let students_spec = [
        ("vbarbier.ieu2021@student.ie.edu", "Victor Barbier"),
        ("lbrudniakber.ieu2021@student.ie.edu", "Lea Brudniak"),
        ("ncajiao.ieu2021@student.ie.edu", "Nicolas Cajiao"),
        ("rdantasmarti.ieu2021@student.ie.edu", "Ricardo Dantas"),
        ("cdecarcer.ieu2021@student.ie.edu", "Carlos de Carcer"),
        ("mroriz.ieu2021@student.ie.edu", "Manuel Rodriguez"),
    ];
    let mut students = Vec::new();
    for (email, name) in students_spec {
        let user = auth
            .register(NewUser {
                email: email.into(),
                password: DEMO_PASSWORD.into(),
                display_name: name.into(),
                role: Role::Student,
                photo_url: None,
                major: Some("Computer Science".into()),
                year: Some(3),
                department: None,
                office_hours: None,
            })
            .await?;
        students.push(user.id);
    }
    summary.users = 1 + students.len();

    let all_students: Vec<&String> = students.iter().collect();
    insert_class(
        db,
        "cs401",
        "Advanced Programming",
        &professor.id,
        "Mon/Wed 10:00-11:30",
        &all_students[..4],
    )
    .await?;
    insert_class(
        db,
        "math301",
        "Mathematics for Computer Science",
        &professor.id,
        "Tue/Thu 9:00-10:30",
        &all_students[1..5],
    )
    .await?;
    insert_class(
        db,
        "bus271",
        "Business Fundamentals",
        &professor.id,
        "Fri 14:00-17:00",
        &all_students[2..],
    )
    .await?;
    insert_class(
        db,
        "conflicts101",
        "Conflicts Business and Law",
        &professor.id,
        "Wed 15:00-18:00",
        &all_students,
    )
    .await?;
    summary.classes = 4;

    // Subgroups on the seminar class, split roster halves
    for (idx, (name, due, color, members)) in [
        ("Research Group A", "2025-04-18", "bg-blue-500", &students[..3]),
        ("Research Group B", "2025-04-25", "bg-green-500", &students[3..]),
    ]
    .into_iter()
    .enumerate()
    {
        let sg_id = format!("conflicts101_sg_{}", idx + 1);
        sqlx::query(
            "INSERT INTO subgroups (id, class_id, name, due_date, color, last_message) VALUES (?, 'conflicts101', ?, ?, ?, NULL)",
        )
        .bind(&sg_id)
        .bind(name)
        .bind(due)
        .bind(color)
        .execute(&db.pool)
        .await?;
        for member in members {
            sqlx::query("INSERT OR IGNORE INTO subgroup_members (subgroup_id, student_id) VALUES (?, ?)")
                .bind(&sg_id)
                .bind(member.as_str())
                .execute(&db.pool)
                .await?;
        }
    }

    insert_meeting(
        db,
        "meeting_1",
        &students[0],
        &professor.id,
        "conflicts101",
        "2025-03-15",
        "14:00",
        "Discuss case study analysis",
        "pending",
        None,
        3,
    )
    .await?;
    insert_meeting(
        db,
        "meeting_2",
        &students[1],
        &professor.id,
        "conflicts101",
        "2025-03-18",
        "13:30",
        "Review research proposal",
        "rejected",
        Some("I have a faculty meeting at this time. Please reschedule for next week."),
        5,
    )
    .await?;
    insert_meeting(
        db,
        "meeting_3",
        &students[2],
        &professor.id,
        "conflicts101",
        "2025-03-20",
        "15:00",
        "Discuss research methodology",
        "pending",
        None,
        2,
    )
    .await?;
    insert_meeting(
        db,
        "meeting_4",
        &students[3],
        &professor.id,
        "conflicts101",
        "2025-03-16",
        "11:00",
        "Review assignment feedback",
        "accepted",
        Some("Looking forward to our meeting!"),
        6,
    )
    .await?;
    summary.meetings = 4;

    // One AI conversation per student, opened with the assistant greeting
    for (student_id, (_, name)) in students.iter().zip(students_spec) {
        let chat_id = format!("ai_chat_{}", student_id);
        insert_chat(db, &chat_id, "ai", None, None, &[student_id.as_str(), AI_ASSISTANT], 30).await?;
        let first = name.split(' ').next().unwrap_or(name);
        insert_message(
            db,
            &chat_id,
            AI_ASSISTANT,
            &format!("Hello {}, I'm Ed AI. How can I help you today?", first),
            1,
            true,
        )
        .await?;
        summary.chats += 1;
        summary.messages += 1;
    }

    // Professor <-> Victor, with one message still unread on the student
    // side (matches the "new message" notification below)
    insert_chat(db, "chat_1", "direct", None, None, &[professor.id.as_str(), students[0].as_str()], 12).await?;
    insert_message(db, "chat_1", &students[0], "Good afternoon professor, could we go over my case study outline?", 10, true).await?;
    insert_message(db, "chat_1", &professor.id, "Of course. Send it over and book a slot through the meetings page.", 9, false).await?;
    summary.chats += 1;
    summary.messages += 2;

    // Two students coordinating
    insert_chat(db, "chat_2", "direct", None, None, &[students[0].as_str(), students[1].as_str()], 8).await?;
    insert_message(db, "chat_2", &students[1], "Did you start the statistics assignment yet?", 4, true).await?;
    insert_message(db, "chat_2", &students[0], "Halfway through, I'll share my notes tonight.", 4, true).await?;
    summary.chats += 1;
    summary.messages += 2;

    // Class study group
    let group_members: Vec<&str> = students[..4].iter().map(String::as_str).collect();
    insert_chat(
        db,
        "chat_3",
        "group",
        Some("CS401 Study Group"),
        Some("cs401"),
        &group_members,
        20,
    )
    .await?;
    insert_message(db, "chat_3", &students[2], "Reminder: mock exam this Friday.", 2, false).await?;
    summary.chats += 1;
    summary.messages += 1;

    insert_notification(
        db,
        "notif_1",
        &students[3],
        "Meeting Request Status",
        "Professor Llorente has accepted your meeting request.",
        "meeting",
        Some("meeting_4"),
        false,
        5,
    )
    .await?;
    insert_notification(
        db,
        "notif_2",
        &students[1],
        "Meeting Request Status",
        "Professor Llorente has rejected your meeting request. Please reschedule.",
        "meeting",
        Some("meeting_2"),
        true,
        4,
    )
    .await?;
    insert_notification(
        db,
        "notif_3",
        &students[2],
        "New Assignment",
        "A new assignment has been posted in Conflicts Business and Law.",
        "class",
        Some("conflicts101"),
        false,
        1,
    )
    .await?;
    insert_notification(
        db,
        "notif_4",
        &students[0],
        "New Message",
        "You have a new message from Professor Llorente.",
        "chat",
        Some("chat_1"),
        false,
        9,
    )
    .await?;
    insert_notification(
        db,
        "notif_5",
        &professor.id,
        "New Meeting Request",
        "Victor Barbier has requested a meeting.",
        "meeting",
        Some("meeting_1"),
        true,
        3,
    )
    .await?;
    insert_notification(
        db,
        "notif_6",
        &professor.id,
        "New Meeting Request",
        "Nicolas Cajiao has requested a meeting.",
        "meeting",
        Some("meeting_3"),
        false,
        2,
    )
    .await?;
    summary.notifications = 6;

    for collection in [
        Collection::Users,
        Collection::Classes,
        Collection::Meetings,
        Collection::Chats,
        Collection::Messages,
        Collection::Notifications,
    ] {
        bus.notify(collection);
    }

    log::info!(
        "[SEED] Seeded {} users, {} classes, {} meetings, {} chats, {} messages, {} notifications",
        summary.users,
        summary.classes,
        summary.meetings,
        summary.chats,
        summary.messages,
        summary.notifications
    );
    Ok(summary)
}
