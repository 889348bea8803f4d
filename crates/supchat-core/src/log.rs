use std::sync::Arc;

use supchat_db::models::MessageRow;
use supchat_db::{Database, timestamp_now};
use supchat_types::api::{MessagePage, TagRef};
use supchat_types::models::{Attachment, Message, MessageKind, MessageTag, Party};
use supchat_types::{ChatError, ChatResult};
use tracing::debug;
use uuid::Uuid;

use crate::cursor::Cursor;
use crate::resolver::{Resolution, TagResolver};

/// Hard cap on page size; callers asking for more get this.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Search returns at most this many hits, newest first.
pub const SEARCH_LIMIT: u32 = 20;

/// Append-only ordered store of messages within a channel. Owns ordering,
/// keyset pagination and body search; read-state transitions live in
/// `ReadStateTracker`.
pub struct MessageLog {
    db: Arc<Database>,
    resolver: Arc<TagResolver>,
}

impl MessageLog {
    pub fn new(db: Arc<Database>, resolver: Arc<TagResolver>) -> Self {
        Self { db, resolver }
    }

    pub fn append(
        &self,
        channel_id: Uuid,
        sender: Party,
        body: &str,
        kind: MessageKind,
        tag: Option<TagRef>,
        attachment: Option<Attachment>,
    ) -> ChatResult<Message> {
        let channel = self
            .db
            .get_channel(&channel_id.to_string())?
            .ok_or_else(|| ChatError::not_found(format!("channel {channel_id}")))?;
        if !channel.active {
            return Err(ChatError::not_found(format!(
                "channel {channel_id} is no longer active"
            )));
        }

        if body.trim().is_empty() && attachment.is_none() {
            return Err(ChatError::invalid("message body is empty"));
        }
        if let Some(att) = &attachment {
            if att.url.trim().is_empty() || att.name.trim().is_empty() {
                return Err(ChatError::invalid("attachment needs a url and a name"));
            }
        }

        let tag = self.capture_tag(kind, tag)?;

        let id = Uuid::new_v4();
        let created_at = timestamp_now();

        let snapshot_json = match &tag {
            Some(t) => t
                .snapshot
                .as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(anyhow::Error::from)?,
            None => None,
        };

        let row = MessageRow {
            id: id.to_string(),
            channel_id: channel_id.to_string(),
            sender_kind: sender.kind_str().to_string(),
            sender_ref: sender.ref_id().to_string(),
            body: body.to_string(),
            kind: kind.as_str().to_string(),
            tag_kind: tag.as_ref().map(|t| t.kind.as_str().to_string()),
            tag_target_id: tag.as_ref().map(|t| t.target_id.clone()),
            tag_snapshot: snapshot_json,
            attachment_url: attachment.as_ref().map(|a| a.url.clone()),
            attachment_name: attachment.as_ref().map(|a| a.name.clone()),
            attachment_size: attachment.as_ref().map(|a| a.size_bytes as i64),
            is_read: false,
            read_at: None,
            is_edited: false,
            edited_at: None,
            created_at,
        };

        // The insert re-checks `active` inside its own transaction, so a
        // deactivate racing past the check above still loses.
        if !self.db.insert_message(&row)? {
            return Err(ChatError::not_found(format!(
                "channel {channel_id} is no longer active"
            )));
        }
        debug!(channel_id = %channel_id, message_id = %id, kind = kind.as_str(), "message appended");

        Ok(row.into_message()?)
    }

    /// A tag must agree with the message kind, and a plain message must
    /// not carry one. The snapshot is captured here, once, at send time.
    fn capture_tag(
        &self,
        kind: MessageKind,
        tag: Option<TagRef>,
    ) -> ChatResult<Option<MessageTag>> {
        let tag = match (kind.tag_kind(), tag) {
            (None, None) => return Ok(None),
            (None, Some(_)) => {
                return Err(ChatError::invalid("plain message cannot carry a tag"));
            }
            (Some(expected), None) => {
                return Err(ChatError::invalid(format!(
                    "{} message requires a tag",
                    expected.as_str()
                )));
            }
            (Some(expected), Some(tag)) if tag.kind != expected => {
                return Err(ChatError::invalid(format!(
                    "tag kind {} does not match message kind {}",
                    tag.kind.as_str(),
                    kind.as_str()
                )));
            }
            (Some(_), Some(tag)) => tag,
        };

        let snapshot = match self.resolver.resolve(tag.kind, &tag.target_id)? {
            Resolution::Found(snapshot) => Some(snapshot),
            Resolution::Missing => None,
        };

        Ok(Some(MessageTag {
            kind: tag.kind,
            target_id: tag.target_id,
            snapshot,
        }))
    }

    /// Ascending chronological page, strictly after `cursor` when given.
    pub fn page(
        &self,
        channel_id: Uuid,
        cursor: Option<&str>,
        limit: u32,
    ) -> ChatResult<MessagePage> {
        self.require_channel(channel_id)?;

        if limit == 0 {
            return Err(ChatError::invalid("limit must be positive"));
        }
        let limit = limit.min(MAX_PAGE_SIZE);
        let after = cursor.map(Cursor::decode).transpose()?;
        let after_ref = after
            .as_ref()
            .map(|c| (c.created_at.as_str(), c.id.as_str()));

        // Fetch one past the page to learn whether there is more.
        let mut rows = self
            .db
            .page_messages(&channel_id.to_string(), after_ref, limit + 1)?;

        let next_cursor = if rows.len() as u32 > limit {
            rows.truncate(limit as usize);
            let last = rows.last().expect("non-empty page");
            Some(
                Cursor {
                    created_at: last.created_at.clone(),
                    id: last.id.clone(),
                }
                .encode(),
            )
        } else {
            None
        };

        let items = rows
            .into_iter()
            .map(|r| r.into_message())
            .collect::<anyhow::Result<Vec<Message>>>()?;

        Ok(MessagePage { items, next_cursor })
    }

    /// Case-insensitive substring match over body, optionally filtered by
    /// message kind. Pure read.
    pub fn search(
        &self,
        channel_id: Uuid,
        needle: &str,
        kind: Option<MessageKind>,
    ) -> ChatResult<Vec<Message>> {
        if needle.trim().is_empty() {
            return Err(ChatError::invalid("search query is empty"));
        }
        self.require_channel(channel_id)?;

        let rows = self.db.search_messages(
            &channel_id.to_string(),
            needle,
            kind.map(|k| k.as_str()),
            SEARCH_LIMIT,
        )?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_message())
            .collect::<anyhow::Result<Vec<Message>>>()?)
    }

    fn require_channel(&self, channel_id: Uuid) -> ChatResult<()> {
        self.db
            .get_channel(&channel_id.to_string())?
            .ok_or_else(|| ChatError::not_found(format!("channel {channel_id}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use supchat_db::artifacts::SqliteArtifactStore;
    use supchat_types::models::{TagKind, TagSnapshot};

    use crate::registry::ChatRegistry;

    use super::*;

    fn fixture() -> (Arc<Database>, ChatRegistry, MessageLog) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let resolver = Arc::new(TagResolver::new(
            Arc::new(SqliteArtifactStore::new(db.clone(), TagKind::Document)),
            Arc::new(SqliteArtifactStore::new(db.clone(), TagKind::Task)),
            Arc::new(SqliteArtifactStore::new(db.clone(), TagKind::Milestone)),
        ));
        let registry = ChatRegistry::new(db.clone());
        let log = MessageLog::new(db.clone(), resolver);
        (db, registry, log)
    }

    fn student() -> Party {
        Party::Student("S1".into())
    }

    #[test]
    fn pages_in_order_with_cursor_handoff() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();

        for body in ["a", "b", "c"] {
            log.append(channel.id, student(), body, MessageKind::Plain, None, None)
                .unwrap();
        }

        let first = log.page(channel.id, None, 2).unwrap();
        let bodies: Vec<&str> = first.items.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["a", "b"]);
        let cursor = first.next_cursor.expect("more pages");

        let second = log.page(channel.id, Some(&cursor), 2).unwrap();
        let bodies: Vec<&str> = second.items.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["c"]);
        assert!(second.next_cursor.is_none());
    }

    #[test]
    fn empty_channel_pages_empty() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();

        let page = log.page(channel.id, None, 50).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn limit_is_capped_and_zero_is_rejected() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();
        // Asking for an absurd page is served, just capped.
        assert!(log.page(channel.id, None, 1_000_000).unwrap().items.is_empty());
        assert!(matches!(
            log.page(channel.id, None, 0),
            Err(ChatError::InvalidArgument(_))
        ));
    }

    #[test]
    fn append_updates_last_activity() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();
        let before = registry.get(channel.id).unwrap().last_activity_at;

        let msg = log
            .append(channel.id, student(), "hello", MessageKind::Plain, None, None)
            .unwrap();

        let after = registry.get(channel.id).unwrap().last_activity_at;
        assert_eq!(after, msg.created_at);
        assert!(after >= before);
    }

    #[test]
    fn rejects_empty_body_without_attachment() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();

        let err = log.append(channel.id, student(), "   ", MessageKind::Plain, None, None);
        assert!(matches!(err, Err(ChatError::InvalidArgument(_))));

        // With an attachment the body may be empty.
        let att = Attachment {
            url: "https://files.example/draft.pdf".into(),
            name: "draft.pdf".into(),
            size_bytes: 1024,
        };
        log.append(channel.id, student(), "", MessageKind::Plain, None, Some(att))
            .unwrap();
    }

    #[test]
    fn rejects_tag_kind_mismatch() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();

        let tag = TagRef {
            kind: TagKind::Document,
            target_id: "D1".into(),
        };
        let err = log.append(
            channel.id,
            student(),
            "look at this",
            MessageKind::TaskTag,
            Some(tag),
            None,
        );
        assert!(matches!(err, Err(ChatError::InvalidArgument(_))));

        let err = log.append(
            channel.id,
            student(),
            "no tag supplied",
            MessageKind::TaskTag,
            None,
            None,
        );
        assert!(matches!(err, Err(ChatError::InvalidArgument(_))));
    }

    #[test]
    fn append_to_deactivated_channel_is_not_found() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();
        log.append(channel.id, student(), "hi", MessageKind::Plain, None, None)
            .unwrap();
        registry.deactivate(channel.id).unwrap();

        let err = log.append(channel.id, student(), "late", MessageKind::Plain, None, None);
        assert!(matches!(err, Err(ChatError::NotFound(_))));

        // History stays readable.
        assert_eq!(log.page(channel.id, None, 10).unwrap().items.len(), 1);
    }

    #[test]
    fn snapshot_is_immutable_after_external_delete() {
        let (db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();
        db.upsert_task("T1", "S1", "Write intro", "", "open").unwrap();

        let tag = TagRef {
            kind: TagKind::Task,
            target_id: "T1".into(),
        };
        let sent = log
            .append(
                channel.id,
                student(),
                "please review",
                MessageKind::TaskTag,
                Some(tag),
                None,
            )
            .unwrap();
        let snap = sent.tag.as_ref().unwrap().snapshot.as_ref().unwrap();
        assert_eq!(snap.title(), "Write intro");

        // Mutate then delete the target; the stored snapshot must not move.
        db.upsert_task("T1", "S1", "Renamed", "", "done").unwrap();
        db.delete_artifact(TagKind::Task, "T1").unwrap();

        let page = log.page(channel.id, None, 10).unwrap();
        let stored = page.items[0].tag.as_ref().unwrap();
        assert_eq!(stored.snapshot.as_ref().unwrap().title(), "Write intro");
    }

    #[test]
    fn missing_target_at_send_time_is_stored_as_tag_without_snapshot() {
        let (_db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();

        let tag = TagRef {
            kind: TagKind::Milestone,
            target_id: "gone".into(),
        };
        let sent = log
            .append(
                channel.id,
                student(),
                "about that milestone",
                MessageKind::MilestoneTag,
                Some(tag),
                None,
            )
            .unwrap();

        let stored = sent.tag.unwrap();
        assert_eq!(stored.target_id, "gone");
        assert!(stored.snapshot.is_none());
    }

    #[test]
    fn search_matches_bodies_and_honors_kind_filter() {
        let (db, registry, log) = fixture();
        let channel = registry.get_or_create("S1", "P1").unwrap();
        db.upsert_task("T1", "S1", "Write intro", "", "open").unwrap();

        log.append(channel.id, student(), "Foo fighters", MessageKind::Plain, None, None)
            .unwrap();
        log.append(
            channel.id,
            student(),
            "foo again",
            MessageKind::TaskTag,
            Some(TagRef {
                kind: TagKind::Task,
                target_id: "T1".into(),
            }),
            None,
        )
        .unwrap();
        log.append(channel.id, student(), "bar only", MessageKind::Plain, None, None)
            .unwrap();

        let hits = log.search(channel.id, "FOO", None).unwrap();
        assert_eq!(hits.len(), 2);

        let hits = log.search(channel.id, "foo", Some(MessageKind::TaskTag)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].body, "foo again");
        assert!(matches!(
            hits[0].tag.as_ref().unwrap().snapshot,
            Some(TagSnapshot::Task { .. })
        ));
    }
}
