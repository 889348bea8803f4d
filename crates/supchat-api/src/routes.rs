use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::middleware::require_auth;
use crate::{AppState, channels, messages, taggable};

/// Every route requires a verified identity; there is no public surface.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/channels",
            post(channels::open_channel).get(channels::list_channels),
        )
        .route(
            "/channels/{channel_id}/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/channels/{channel_id}/read", post(messages::mark_read))
        .route("/channels/{channel_id}/search", get(messages::search_messages))
        .route("/students/{student_ref}/taggable", get(taggable::list_taggable))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}
