use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A participant in a supervision conversation. A sender (or caller) is
/// always either a student or a supervisor — never a generic user, and
/// never a role string next to two nullable foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum Party {
    Student(String),
    Supervisor(String),
}

impl Party {
    /// The opaque directory reference behind this party.
    pub fn ref_id(&self) -> &str {
        match self {
            Party::Student(r) | Party::Supervisor(r) => r,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            Party::Student(_) => "student",
            Party::Supervisor(_) => "supervisor",
        }
    }

    pub fn from_kind(kind: &str, r: String) -> Option<Self> {
        match kind {
            "student" => Some(Party::Student(r)),
            "supervisor" => Some(Party::Supervisor(r)),
            _ => None,
        }
    }

    pub fn is_student(&self) -> bool {
        matches!(self, Party::Student(_))
    }
}

/// What a message carries besides (or instead of) plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Plain,
    DocumentTag,
    TaskTag,
    MilestoneTag,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Plain => "plain",
            MessageKind::DocumentTag => "document_tag",
            MessageKind::TaskTag => "task_tag",
            MessageKind::MilestoneTag => "milestone_tag",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plain" => Some(MessageKind::Plain),
            "document_tag" => Some(MessageKind::DocumentTag),
            "task_tag" => Some(MessageKind::TaskTag),
            "milestone_tag" => Some(MessageKind::MilestoneTag),
            _ => None,
        }
    }

    /// The tag domain this kind requires, if any.
    pub fn tag_kind(&self) -> Option<TagKind> {
        match self {
            MessageKind::Plain => None,
            MessageKind::DocumentTag => Some(TagKind::Document),
            MessageKind::TaskTag => Some(TagKind::Task),
            MessageKind::MilestoneTag => Some(TagKind::Milestone),
        }
    }
}

/// Which external aggregate a tag points into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Document,
    Task,
    Milestone,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Document => "document",
            TagKind::Task => "task",
            TagKind::Milestone => "milestone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "document" => Some(TagKind::Document),
            "task" => Some(TagKind::Task),
            "milestone" => Some(TagKind::Milestone),
            _ => None,
        }
    }
}

/// Display-ready projection of a tagged item, captured at send time.
/// This is the canonical record of what was tagged: the stored copy never
/// changes even if the underlying item is later edited or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TagSnapshot {
    Document {
        title: String,
        description: String,
        file_type: String,
    },
    Task {
        title: String,
        description: String,
        status: String,
    },
    Milestone {
        title: String,
        description: String,
        status: String,
        due_date: Option<String>,
    },
}

impl TagSnapshot {
    pub fn kind(&self) -> TagKind {
        match self {
            TagSnapshot::Document { .. } => TagKind::Document,
            TagSnapshot::Task { .. } => TagKind::Task,
            TagSnapshot::Milestone { .. } => TagKind::Milestone,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            TagSnapshot::Document { title, .. }
            | TagSnapshot::Task { title, .. }
            | TagSnapshot::Milestone { title, .. } => title,
        }
    }
}

/// A stored reference from a message to an external item.
/// `snapshot: None` means the target was already gone at send time; the
/// message still records that something was pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTag {
    pub kind: TagKind,
    pub target_id: String,
    pub snapshot: Option<TagSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub size_bytes: u64,
}

/// Per-message read marker. Transitions once to read; never reverts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadState {
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
}

/// Reserved for future in-place edits; persisted so the storage layout is
/// stable, but no edit operation is currently exposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditState {
    pub is_edited: bool,
    pub edited_at: Option<DateTime<Utc>>,
}

/// One supervision relationship's conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub student_ref: String,
    pub supervisor_ref: String,
    pub last_activity_at: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Channel {
    /// Whether the given party is one of the two sides of this channel.
    pub fn has_party(&self, party: &Party) -> bool {
        match party {
            Party::Student(r) => self.student_ref == *r,
            Party::Supervisor(r) => self.supervisor_ref == *r,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender: Party,
    pub body: String,
    pub kind: MessageKind,
    pub tag: Option<MessageTag>,
    pub attachment: Option<Attachment>,
    pub read_state: ReadState,
    pub edit_state: EditState,
    pub created_at: DateTime<Utc>,
}
