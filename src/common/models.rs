use serde::{Deserialize, Serialize};

/// Sentinel participant id for the automated assistant ("Ed AI").
/// It has no row in `users`; the client layer injects a synthetic
/// profile for it.
pub const AI_ASSISTANT: &str = "AI_ASSISTANT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Professor,
    /// Anything the store hands back that we don't recognize. The class
    /// directory treats this as "show everything" rather than failing.
    Unknown,
}

impl Role {
    pub fn parse(s: &str) -> Self {
        match s {
            "student" => Role::Student,
            "professor" => Role::Professor,
            _ => Role::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Professor => "professor",
            Role::Unknown => "unknown",
        }
    }
}

/// Profile record mirrored from the identity provider, keyed by the
/// same id as the principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub role: Role,
    pub major: Option<String>,
    pub year: Option<i64>,
    pub department: Option<String>,
    pub office_hours: Option<String>,
    pub created_at: i64,
    pub last_active: Option<i64>,
}

/// Display metadata cached per participant by the chat sync layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub role: Role,
    pub photo_url: Option<String>,
}

impl UserInfo {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            role: user.role,
            photo_url: user.photo_url.clone(),
        }
    }

    /// Synthetic entry for the assistant participant.
    pub fn assistant() -> Self {
        Self {
            id: AI_ASSISTANT.to_string(),
            display_name: "Ed AI".to_string(),
            email: "ai@assistant.com".to_string(),
            role: Role::Unknown,
            photo_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    pub name: String,
    pub instructor_id: String,
    pub schedule: String,
    pub description: Option<String>,
    pub enrolled_students: Vec<String>,
    pub subgroups: Vec<Subgroup>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subgroup {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub due_date: Option<String>,
    pub color: Option<String>,
    pub last_message: Option<String>,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Pending,
    Accepted,
    Rejected,
}

impl MeetingStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "accepted" => MeetingStatus::Accepted,
            "rejected" => MeetingStatus::Rejected,
            _ => MeetingStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Pending => "pending",
            MeetingStatus::Accepted => "accepted",
            MeetingStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub student_id: String,
    pub professor_id: String,
    pub class_id: Option<String>,
    pub date: String,
    pub time: String,
    pub reason: String,
    pub status: MeetingStatus,
    pub response_message: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Direct,
    Group,
    Ai,
}

impl ChatKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "group" => ChatKind::Group,
            "ai" => ChatKind::Ai,
            _ => ChatKind::Direct,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatKind::Direct => "direct",
            ChatKind::Group => "group",
            ChatKind::Ai => "ai",
        }
    }
}

/// Denormalized preview of the most recent message, kept on the chat
/// record for list rendering. Eventually consistent with `messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LastMessage {
    pub sender_id: String,
    pub text: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub participants: Vec<String>,
    pub kind: ChatKind,
    pub group_name: Option<String>,
    pub class_id: Option<String>,
    pub last_message: Option<LastMessage>,
    pub created_at: i64,
}

impl Chat {
    /// True if this is a direct chat between exactly the given pair,
    /// in either order.
    pub fn is_direct_between(&self, a: &str, b: &str) -> bool {
        self.kind == ChatKind::Direct
            && self.participants.len() == 2
            && self.participants.iter().any(|p| p == a)
            && self.participants.iter().any(|p| p == b)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: i64,
    pub read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Meeting,
    Chat,
    Class,
    System,
}

impl NotificationKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "meeting" => NotificationKind::Meeting,
            "chat" => NotificationKind::Chat,
            "class" => NotificationKind::Class,
            _ => NotificationKind::System,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Meeting => "meeting",
            NotificationKind::Chat => "chat",
            NotificationKind::Class => "class",
            NotificationKind::System => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub kind: NotificationKind,
    pub related_id: Option<String>,
    pub timestamp: i64,
}
