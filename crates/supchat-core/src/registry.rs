use std::sync::Arc;

use supchat_db::{Database, timestamp_now};
use supchat_types::models::Channel;
use supchat_types::{ChatError, ChatResult};
use tracing::info;
use uuid::Uuid;

/// Owns channel identity and lifecycle: one channel per
/// (student, supervisor) pair, created on first contact.
pub struct ChatRegistry {
    db: Arc<Database>,
}

impl ChatRegistry {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Idempotent: concurrent callers for the same pair observe a single
    /// channel. The uniqueness constraint lives in storage; the candidate
    /// id only survives if this call wins the insert.
    pub fn get_or_create(&self, student_ref: &str, supervisor_ref: &str) -> ChatResult<Channel> {
        let student_ref = student_ref.trim();
        let supervisor_ref = supervisor_ref.trim();
        if student_ref.is_empty() {
            return Err(ChatError::invalid("student_ref is empty"));
        }
        if supervisor_ref.is_empty() {
            return Err(ChatError::invalid("supervisor_ref is empty"));
        }

        let candidate = Uuid::new_v4().to_string();
        let row = self.db.get_or_create_channel(
            &candidate,
            student_ref,
            supervisor_ref,
            &timestamp_now(),
        )?;
        if row.id == candidate {
            info!(channel_id = %row.id, student_ref, supervisor_ref, "channel created");
        }
        Ok(row.into_channel()?)
    }

    pub fn get(&self, id: Uuid) -> ChatResult<Channel> {
        let row = self
            .db
            .get_channel(&id.to_string())?
            .ok_or_else(|| ChatError::not_found(format!("channel {id}")))?;
        Ok(row.into_channel()?)
    }

    /// Soft-disable; history stays readable, new appends are refused.
    pub fn deactivate(&self, id: Uuid) -> ChatResult<()> {
        if !self.db.deactivate_channel(&id.to_string())? {
            return Err(ChatError::not_found(format!("channel {id}")));
        }
        info!(channel_id = %id, "channel deactivated");
        Ok(())
    }
}
