mod common;

use std::time::Duration;

use ateneo::backend::meetings::{self, MeetingRequest};
use ateneo::common::error::PortalError;
use ateneo::common::models::MeetingStatus;

fn request(student_id: &str, professor_id: &str, reason: &str) -> MeetingRequest {
    MeetingRequest {
        student_id: student_id.to_string(),
        professor_id: professor_id.to_string(),
        class_id: None,
        date: "2025-03-15".to_string(),
        time: "14:00".to_string(),
        reason: reason.to_string(),
    }
}

#[tokio::test]
async fn create_yields_pending_with_unique_id() {
    let portal = common::portal().await;
    let student = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let professor = common::register_professor(&portal, "p@faculty.ie.edu", "Professor").await;

    let first = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "one"))
        .await
        .expect("create");
    let second = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "two"))
        .await
        .expect("create");

    assert_eq!(first.status, MeetingStatus::Pending);
    assert_eq!(second.status, MeetingStatus::Pending);
    assert_ne!(first.id, second.id);

    let student_list = meetings::list_for_student(&portal.db, &student.id)
        .await
        .expect("list");
    assert!(student_list.iter().any(|m| m.id == first.id));
    assert!(student_list.iter().any(|m| m.id == second.id));

    let professor_list = meetings::list_for_professor(&portal.db, &professor.id)
        .await
        .expect("list");
    assert!(professor_list.iter().any(|m| m.id == first.id));
}

#[tokio::test]
async fn lists_are_ordered_newest_first() {
    let portal = common::portal().await;
    let student = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let professor = common::register_professor(&portal, "p@faculty.ie.edu", "Professor").await;

    let older = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "older"))
        .await
        .expect("create");
    // Millisecond timestamps; keep the two creations apart
    tokio::time::sleep(Duration::from_millis(5)).await;
    let newer = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "newer"))
        .await
        .expect("create");

    let list = meetings::list_for_student(&portal.db, &student.id)
        .await
        .expect("list");
    assert_eq!(list[0].id, newer.id);
    assert_eq!(list[1].id, older.id);
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let portal = common::portal().await;
    let student = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let professor = common::register_professor(&portal, "p@faculty.ie.edu", "Professor").await;

    let err = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "  "))
        .await
        .expect_err("empty reason");
    assert!(matches!(err, PortalError::Validation(_)));
}

#[tokio::test]
async fn transition_is_last_write_wins() {
    let portal = common::portal().await;
    let student = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let professor = common::register_professor(&portal, "p@faculty.ie.edu", "Professor").await;

    let meeting = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "r"))
        .await
        .expect("create");

    meetings::transition(&portal.db, &portal.bus, &meeting.id, MeetingStatus::Accepted, None)
        .await
        .expect("accept");
    // No protection against re-deciding: the second write sticks
    meetings::transition(
        &portal.db,
        &portal.bus,
        &meeting.id,
        MeetingStatus::Rejected,
        Some("Changed my mind"),
    )
    .await
    .expect("reject");

    let current = meetings::get(&portal.db, &meeting.id).await.expect("get");
    assert_eq!(current.status, MeetingStatus::Rejected);
    assert_eq!(current.response_message.as_deref(), Some("Changed my mind"));
}

#[tokio::test]
async fn transition_requires_an_existing_meeting_and_a_decision() {
    let portal = common::portal().await;

    let err = meetings::transition(&portal.db, &portal.bus, "missing", MeetingStatus::Accepted, None)
        .await
        .expect_err("missing meeting");
    assert!(matches!(err, PortalError::NotFound(_)));

    let student = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let professor = common::register_professor(&portal, "p@faculty.ie.edu", "Professor").await;
    let meeting = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "r"))
        .await
        .expect("create");

    let err = meetings::transition(&portal.db, &portal.bus, &meeting.id, MeetingStatus::Pending, None)
        .await
        .expect_err("pending is not a decision");
    assert!(matches!(err, PortalError::Validation(_)));
}

#[tokio::test]
async fn deleted_meetings_are_gone() {
    let portal = common::portal().await;
    let student = common::register_student(&portal, "s@student.ie.edu", "Student").await;
    let professor = common::register_professor(&portal, "p@faculty.ie.edu", "Professor").await;

    let meeting = meetings::create(&portal.db, &portal.bus, request(&student.id, &professor.id, "r"))
        .await
        .expect("create");
    meetings::delete(&portal.db, &portal.bus, &meeting.id)
        .await
        .expect("delete");

    let err = meetings::get(&portal.db, &meeting.id).await.expect_err("gone");
    assert!(matches!(err, PortalError::NotFound(_)));
}

#[tokio::test]
async fn request_accept_round_trip() {
    let portal = common::portal().await;
    let student = common::register_student(&portal, "s@student.ie.edu", "Student S").await;
    let professor = common::register_professor(&portal, "p@faculty.ie.edu", "Professor P").await;

    let meeting = meetings::create(
        &portal.db,
        &portal.bus,
        MeetingRequest {
            student_id: student.id.clone(),
            professor_id: professor.id.clone(),
            class_id: None,
            date: "2025-03-15".to_string(),
            time: "14:00".to_string(),
            reason: "discuss proposal".to_string(),
        },
    )
    .await
    .expect("create");

    let inbox = meetings::list_for_professor(&portal.db, &professor.id)
        .await
        .expect("professor list");
    assert_eq!(inbox[0].id, meeting.id);
    assert_eq!(inbox[0].status, MeetingStatus::Pending);

    meetings::transition(
        &portal.db,
        &portal.bus,
        &meeting.id,
        MeetingStatus::Accepted,
        Some("See you then!"),
    )
    .await
    .expect("accept");

    let mine = meetings::list_for_student(&portal.db, &student.id)
        .await
        .expect("student list");
    assert_eq!(mine[0].status, MeetingStatus::Accepted);
    assert_eq!(mine[0].response_message.as_deref(), Some("See you then!"));
}
