use std::sync::Arc;

use supchat_db::Database;
use supchat_db::artifacts::SqliteArtifactStore;
use supchat_types::api::{
    ChannelListItem, MessagePage, SendMessageRequest, TaggableResponse,
};
use supchat_types::models::{Channel, Message, MessageKind, Party, TagKind};
use supchat_types::{ChatError, ChatResult};
use uuid::Uuid;

use crate::log::MessageLog;
use crate::readstate::ReadStateTracker;
use crate::registry::ChatRegistry;
use crate::resolver::TagResolver;

/// Composition root. Narrows every call to the authenticated caller —
/// identity arrives as an explicit `Party` parameter, never from ambient
/// state — and is the only layer the transport edge talks to.
pub struct ChatService {
    db: Arc<Database>,
    registry: ChatRegistry,
    log: MessageLog,
    tracker: ReadStateTracker,
    resolver: Arc<TagResolver>,
}

impl ChatService {
    pub fn new(db: Arc<Database>, resolver: Arc<TagResolver>) -> Self {
        Self {
            registry: ChatRegistry::new(db.clone()),
            log: MessageLog::new(db.clone(), resolver.clone()),
            tracker: ReadStateTracker::new(db.clone()),
            resolver,
            db,
        }
    }

    /// Wires the resolver to the artifact tables in the same database.
    pub fn with_sqlite_stores(db: Arc<Database>) -> Self {
        let resolver = Arc::new(TagResolver::new(
            Arc::new(SqliteArtifactStore::new(db.clone(), TagKind::Document)),
            Arc::new(SqliteArtifactStore::new(db.clone(), TagKind::Task)),
            Arc::new(SqliteArtifactStore::new(db.clone(), TagKind::Milestone)),
        ));
        Self::new(db, resolver)
    }

    /// The caller must be standing on their own side of the pair they ask
    /// to open: a student can only open channels as that student, a
    /// supervisor only as that supervisor.
    pub fn open_channel(
        &self,
        caller: &Party,
        student_ref: &str,
        supervisor_ref: &str,
    ) -> ChatResult<Channel> {
        let own_side = match caller {
            Party::Student(r) => r == student_ref.trim(),
            Party::Supervisor(r) => r == supervisor_ref.trim(),
        };
        if !own_side {
            return Err(ChatError::forbidden("caller is not a party to this channel"));
        }
        self.registry.get_or_create(student_ref, supervisor_ref)
    }

    pub fn send_message(
        &self,
        caller: &Party,
        channel_id: Uuid,
        req: SendMessageRequest,
    ) -> ChatResult<Message> {
        self.authorize(caller, channel_id)?;
        self.log.append(
            channel_id,
            caller.clone(),
            &req.body,
            req.kind,
            req.tag,
            req.attachment,
        )
    }

    pub fn page_messages(
        &self,
        caller: &Party,
        channel_id: Uuid,
        cursor: Option<&str>,
        limit: u32,
    ) -> ChatResult<MessagePage> {
        self.authorize(caller, channel_id)?;
        self.log.page(channel_id, cursor, limit)
    }

    pub fn search_messages(
        &self,
        caller: &Party,
        channel_id: Uuid,
        needle: &str,
        kind: Option<MessageKind>,
    ) -> ChatResult<Vec<Message>> {
        self.authorize(caller, channel_id)?;
        self.log.search(channel_id, needle, kind)
    }

    pub fn mark_read(&self, caller: &Party, channel_id: Uuid) -> ChatResult<u64> {
        self.authorize(caller, channel_id)?;
        self.tracker.mark_read(channel_id, caller)
    }

    /// The caller's conversation list, most recently active first.
    pub fn list_channels(&self, caller: &Party) -> ChatResult<Vec<ChannelListItem>> {
        let rows = self
            .db
            .list_channels_for_party(caller.kind_str(), caller.ref_id())?;
        rows.into_iter()
            .map(|(row, unread_count)| {
                Ok(ChannelListItem {
                    channel: row.into_channel()?,
                    unread_count,
                })
            })
            .collect()
    }

    /// Live catalog of items the student can tag. Students see their own;
    /// a supervisor sees a student's catalog only if they supervise them,
    /// which is exactly "a channel exists for the pair".
    pub fn list_taggable(&self, caller: &Party, student_ref: &str) -> ChatResult<TaggableResponse> {
        match caller {
            Party::Student(r) => {
                if r != student_ref {
                    return Err(ChatError::forbidden("students may only list their own items"));
                }
            }
            Party::Supervisor(r) => {
                if !self.db.channel_exists_for_pair(student_ref, r)? {
                    return Err(ChatError::forbidden(
                        "caller does not supervise this student",
                    ));
                }
            }
        }
        self.resolver.list_taggable(student_ref)
    }

    fn authorize(&self, caller: &Party, channel_id: Uuid) -> ChatResult<Channel> {
        let channel = self.registry.get(channel_id)?;
        if !channel.has_party(caller) {
            return Err(ChatError::forbidden("caller is not a party to this channel"));
        }
        Ok(channel)
    }
}
