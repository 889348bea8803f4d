use std::sync::Arc;

use supchat_db::{Database, timestamp_now};
use supchat_types::models::Party;
use supchat_types::{ChatError, ChatResult};
use tracing::debug;
use uuid::Uuid;

/// Bulk read-state transitions. The read flag only ever moves one way.
pub struct ReadStateTracker {
    db: Arc<Database>,
}

impl ReadStateTracker {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Marks every unread message in the channel not sent by `reader` as
    /// read. One conditional bulk update in storage; calling it again with
    /// nothing new returns 0.
    pub fn mark_read(&self, channel_id: Uuid, reader: &Party) -> ChatResult<u64> {
        self.db
            .get_channel(&channel_id.to_string())?
            .ok_or_else(|| ChatError::not_found(format!("channel {channel_id}")))?;

        let count =
            self.db
                .mark_read(&channel_id.to_string(), reader.ref_id(), &timestamp_now())?;
        debug!(channel_id = %channel_id, reader = reader.ref_id(), count, "marked read");
        Ok(count as u64)
    }
}
