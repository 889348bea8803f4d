use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use supchat_types::{ChatError, ChatResult};
use tracing::error;

/// Transport-side wrapper. This is the only place domain failures meet
/// HTTP status codes; core components never see them.
pub struct ApiError(ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn internal(msg: &str) -> Self {
        ApiError(ChatError::Unavailable(anyhow::anyhow!(msg.to_string())))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ChatError::InvalidArgument(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ChatError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ChatError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            // get_or_create swallows pair conflicts into idempotent
            // success, so a surfaced conflict is a real one.
            ChatError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ChatError::Unavailable(e) => {
                error!("storage failure: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Run a blocking service call off the async runtime.
pub async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> ChatResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("task join failure")
        })?
        .map_err(ApiError::from)
}
