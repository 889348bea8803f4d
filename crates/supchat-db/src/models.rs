//! Database row types — these map directly to SQLite rows.
//! Conversion into the shared domain types happens here so corrupt rows
//! surface as errors at the storage boundary, not deeper in the core.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use supchat_types::models::{
    Attachment, Channel, EditState, Message, MessageKind, MessageTag, Party, ReadState, TagKind,
    TagSnapshot,
};

pub struct ChannelRow {
    pub id: String,
    pub student_ref: String,
    pub supervisor_ref: String,
    pub last_activity_at: String,
    pub active: bool,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub channel_id: String,
    pub sender_kind: String,
    pub sender_ref: String,
    pub body: String,
    pub kind: String,
    pub tag_kind: Option<String>,
    pub tag_target_id: Option<String>,
    pub tag_snapshot: Option<String>,
    pub attachment_url: Option<String>,
    pub attachment_name: Option<String>,
    pub attachment_size: Option<i64>,
    pub is_read: bool,
    pub read_at: Option<String>,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub created_at: String,
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

fn parse_ts_opt(raw: &Option<String>) -> Result<Option<DateTime<Utc>>> {
    raw.as_deref().map(parse_ts).transpose()
}

impl ChannelRow {
    pub fn into_channel(self) -> Result<Channel> {
        Ok(Channel {
            id: self
                .id
                .parse()
                .with_context(|| format!("corrupt channel id '{}'", self.id))?,
            last_activity_at: parse_ts(&self.last_activity_at)?,
            created_at: parse_ts(&self.created_at)?,
            student_ref: self.student_ref,
            supervisor_ref: self.supervisor_ref,
            active: self.active,
        })
    }
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        let sender = Party::from_kind(&self.sender_kind, self.sender_ref.clone())
            .ok_or_else(|| anyhow!("corrupt sender_kind '{}'", self.sender_kind))?;

        let kind = MessageKind::parse(&self.kind)
            .ok_or_else(|| anyhow!("corrupt message kind '{}'", self.kind))?;

        let tag = match (&self.tag_kind, &self.tag_target_id) {
            (Some(k), Some(target_id)) => {
                let tag_kind = TagKind::parse(k)
                    .ok_or_else(|| anyhow!("corrupt tag_kind '{}'", k))?;
                let snapshot: Option<TagSnapshot> = self
                    .tag_snapshot
                    .as_deref()
                    .map(serde_json::from_str)
                    .transpose()
                    .context("corrupt tag_snapshot JSON")?;
                Some(MessageTag {
                    kind: tag_kind,
                    target_id: target_id.clone(),
                    snapshot,
                })
            }
            (None, None) => None,
            _ => return Err(anyhow!("tag_kind and tag_target_id out of sync")),
        };

        let attachment = match (&self.attachment_url, &self.attachment_name) {
            (Some(url), Some(name)) => Some(Attachment {
                url: url.clone(),
                name: name.clone(),
                size_bytes: self.attachment_size.unwrap_or(0) as u64,
            }),
            _ => None,
        };

        Ok(Message {
            id: self
                .id
                .parse()
                .with_context(|| format!("corrupt message id '{}'", self.id))?,
            channel_id: self
                .channel_id
                .parse()
                .with_context(|| format!("corrupt channel_id on message '{}'", self.id))?,
            sender,
            kind,
            tag,
            attachment,
            read_state: ReadState {
                is_read: self.is_read,
                read_at: parse_ts_opt(&self.read_at)?,
            },
            edit_state: EditState {
                is_edited: self.is_edited,
                edited_at: parse_ts_opt(&self.edited_at)?,
            },
            created_at: parse_ts(&self.created_at)?,
            body: self.body,
        })
    }
}
