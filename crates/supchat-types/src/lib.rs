pub mod api;
pub mod error;
pub mod models;
pub mod store;

pub use error::{ChatError, ChatResult};
pub use models::{
    Attachment, Channel, EditState, Message, MessageKind, MessageTag, Party, ReadState,
    TagKind, TagSnapshot,
};
pub use store::{ArtifactStore, TaggableItem};
