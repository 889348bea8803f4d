use serde::{Deserialize, Serialize};

use crate::models::{Attachment, Channel, Message, MessageKind, Party, TagKind};
use crate::store::TaggableItem;

// -- JWT Claims --

/// Verified identity produced by the external auth system. Canonical
/// definition lives here so the REST middleware and any future transport
/// share one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Supervisor,
}

impl Claims {
    pub fn party(&self) -> Party {
        match self.role {
            Role::Student => Party::Student(self.sub.clone()),
            Role::Supervisor => Party::Supervisor(self.sub.clone()),
        }
    }
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenChannelRequest {
    pub student_ref: String,
    pub supervisor_ref: String,
}

/// A channel as it appears in the caller's conversation list, with the
/// unread badge count for that caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListItem {
    #[serde(flatten)]
    pub channel: Channel,
    pub unread_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListResponse {
    pub items: Vec<ChannelListItem>,
}

// -- Messages --

/// The client names the tag target; the snapshot is captured server-side
/// at send time and is never client-supplied.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TagRef {
    pub kind: TagKind,
    pub target_id: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub body: String,
    pub kind: MessageKind,
    #[serde(default)]
    pub tag: Option<TagRef>,
    #[serde(default)]
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagePage {
    pub items: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    /// Number of messages transitioned to read, for UI badges.
    pub count: u64,
}

// -- Taggable catalog --

#[derive(Debug, Serialize, Deserialize)]
pub struct TaggableResponse {
    pub documents: Vec<TaggableItem>,
    pub tasks: Vec<TaggableItem>,
    pub milestones: Vec<TaggableItem>,
}
