pub mod cursor;
pub mod log;
pub mod readstate;
pub mod registry;
pub mod resolver;
pub mod service;

pub use cursor::Cursor;
pub use log::MessageLog;
pub use readstate::ReadStateTracker;
pub use registry::ChatRegistry;
pub use resolver::{Resolution, TagResolver};
pub use service::ChatService;
