use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use supchat_types::api::{ChannelListResponse, Claims, OpenChannelRequest};

use crate::AppState;
use crate::error::{ApiError, run_blocking};

/// Idempotent: opening the same pair twice returns the same channel, and
/// a racing first-contact never surfaces as a conflict.
pub async fn open_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<OpenChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.party();
    let channel = run_blocking(move || {
        state
            .service
            .open_channel(&caller, &req.student_ref, &req.supervisor_ref)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn list_channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.party();
    let items = run_blocking(move || state.service.list_channels(&caller)).await?;
    Ok(Json(ChannelListResponse { items }))
}
