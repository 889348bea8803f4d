use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use supchat_types::api::{Claims, MarkReadResponse, SearchResponse, SendMessageRequest};
use supchat_types::models::MessageKind;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, run_blocking};

#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    /// Keyset cursor from the previous page's `next_cursor`; omit to
    /// start at the beginning of the log.
    pub cursor: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub kind: Option<MessageKind>,
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.party();
    let message =
        run_blocking(move || state.service.send_message(&caller, channel_id, req)).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

pub async fn get_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<MessageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.party();
    let page = run_blocking(move || {
        state
            .service
            .page_messages(&caller, channel_id, query.cursor.as_deref(), query.limit)
    })
    .await?;

    Ok(Json(page))
}

pub async fn search_messages(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.party();
    let items = run_blocking(move || {
        state
            .service
            .search_messages(&caller, channel_id, &query.q, query.kind)
    })
    .await?;

    Ok(Json(SearchResponse { items }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.party();
    let count = run_blocking(move || state.service.mark_read(&caller, channel_id)).await?;
    Ok(Json(MarkReadResponse { count }))
}
