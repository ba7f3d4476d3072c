use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bukukami_shared::TransportError;
use bukukami_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("Worker event channel closed")]
    ChannelClosed,
}

impl IntoResponse for WorkerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            WorkerError::Transport(TransportError::InvalidRequest(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            WorkerError::Transport(_) | WorkerError::ChannelClosed => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            WorkerError::Store(_) | WorkerError::Platform(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal worker error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
