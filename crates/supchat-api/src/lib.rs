pub mod channels;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod taggable;

use std::sync::Arc;

use supchat_core::ChatService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub service: ChatService,
    pub jwt_secret: String,
}
