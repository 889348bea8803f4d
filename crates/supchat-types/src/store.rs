use serde::{Deserialize, Serialize};

use crate::models::{TagKind, TagSnapshot};

/// An item a student may tag in a message, as listed by an external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaggableItem {
    pub id: String,
    #[serde(flatten)]
    pub item: TagSnapshot,
}

/// Narrow lookup interface over one external artifact store (documents,
/// tasks, or milestones). Implemented once per store; the chat core never
/// touches those aggregates any other way.
pub trait ArtifactStore: Send + Sync {
    /// The tag domain this store serves.
    fn kind(&self) -> TagKind;

    /// ID-keyed lookup. `Ok(None)` means the item no longer exists, which
    /// callers treat as data, not as a failure.
    fn fetch_by_id(&self, id: &str) -> anyhow::Result<Option<TagSnapshot>>;

    /// Current items belonging to the given student, for tag pickers.
    fn list_for_student(&self, student_ref: &str) -> anyhow::Result<Vec<TaggableItem>>;
}
