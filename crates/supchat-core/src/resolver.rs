use std::sync::Arc;

use supchat_types::api::TaggableResponse;
use supchat_types::models::{TagKind, TagSnapshot};
use supchat_types::store::ArtifactStore;
use supchat_types::{ChatError, ChatResult};
use tracing::debug;

/// Outcome of resolving a tag reference against its external store.
/// `Missing` is data, not a failure: the message still records that
/// something was pointed at when it was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(TagSnapshot),
    Missing,
}

/// Dispatches a `(kind, id)` reference to the matching external store.
///
/// Snapshot policy: the resolver is called exactly once per tag, at send
/// time, and the result becomes the canonical stored snapshot. Live
/// lookups (`list_taggable`) exist only for tag pickers and navigation —
/// message rendering never re-resolves.
pub struct TagResolver {
    documents: Arc<dyn ArtifactStore>,
    tasks: Arc<dyn ArtifactStore>,
    milestones: Arc<dyn ArtifactStore>,
}

impl TagResolver {
    pub fn new(
        documents: Arc<dyn ArtifactStore>,
        tasks: Arc<dyn ArtifactStore>,
        milestones: Arc<dyn ArtifactStore>,
    ) -> Self {
        debug_assert_eq!(documents.kind(), TagKind::Document);
        debug_assert_eq!(tasks.kind(), TagKind::Task);
        debug_assert_eq!(milestones.kind(), TagKind::Milestone);
        Self {
            documents,
            tasks,
            milestones,
        }
    }

    fn store(&self, kind: TagKind) -> &dyn ArtifactStore {
        match kind {
            TagKind::Document => self.documents.as_ref(),
            TagKind::Task => self.tasks.as_ref(),
            TagKind::Milestone => self.milestones.as_ref(),
        }
    }

    pub fn resolve(&self, kind: TagKind, target_id: &str) -> ChatResult<Resolution> {
        if target_id.trim().is_empty() {
            return Err(ChatError::invalid("tag target_id is empty"));
        }

        match self.store(kind).fetch_by_id(target_id)? {
            Some(snapshot) => Ok(Resolution::Found(snapshot)),
            None => {
                debug!(kind = kind.as_str(), target_id, "tag target missing at resolve time");
                Ok(Resolution::Missing)
            }
        }
    }

    /// Fan-out over all three stores for the tag picker. Read-only; the
    /// chat core owns none of this state.
    pub fn list_taggable(&self, student_ref: &str) -> ChatResult<TaggableResponse> {
        Ok(TaggableResponse {
            documents: self.documents.list_for_student(student_ref)?,
            tasks: self.tasks.list_for_student(student_ref)?,
            milestones: self.milestones.list_for_student(student_ref)?,
        })
    }
}
