use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use supchat_types::api::Claims;

use crate::AppState;
use crate::error::{ApiError, run_blocking};

/// Live catalog for the tag picker. This is the one place tags are
/// resolved against current state; stored messages render from their
/// send-time snapshots.
pub async fn list_taggable(
    State(state): State<AppState>,
    Path(student_ref): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = claims.party();
    let catalog =
        run_blocking(move || state.service.list_taggable(&caller, &student_ref)).await?;
    Ok(Json(catalog))
}
