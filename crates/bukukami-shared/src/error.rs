use thiserror::Error;

/// Failure categories every foreground component reports in.
///
/// Storage and push-platform failures are normally caught at the component
/// boundary and degraded; the variants here are what remains visible to the
/// application shell and, through [`AppError::user_message`], to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Local storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Remote rejected request ({status}): {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(Permission),

    #[error("Push service unavailable: {0}")]
    PushUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Another operation is already in progress")]
    Busy,
}

impl AppError {
    /// Short text suitable for an immediate user notice.
    pub fn user_message(&self) -> String {
        match self {
            AppError::AuthRequired => "Please sign in first.".to_string(),
            AppError::NetworkUnavailable(_) => {
                "You appear to be offline. Check your connection.".to_string()
            }
            AppError::StorageUnavailable(_) => {
                "Offline storage is unavailable; working online only.".to_string()
            }
            AppError::RemoteRejected { message, .. } => message.clone(),
            AppError::PermissionDenied(p) => format!("{p} permission was denied."),
            AppError::PushUnavailable(_) => "Push notifications are unavailable.".to_string(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Busy => "Please wait for the current operation to finish.".to_string(),
        }
    }

    /// Whether retrying later may succeed without user intervention.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::NetworkUnavailable(_))
    }
}

/// Platform permissions the application asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Notification,
    Camera,
    Geolocation,
}

impl std::fmt::Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Permission::Notification => "Notification",
            Permission::Camera => "Camera",
            Permission::Geolocation => "Geolocation",
        };
        f.write_str(name)
    }
}

/// Errors raised by a [`crate::http::Transport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The request never produced a response (DNS, connect, reset, timeout).
    #[error("Network error: {0}")]
    Network(String),

    /// The request could not be built from the given parts.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The background worker that should have carried the request is gone.
    #[error("Worker unavailable")]
    WorkerUnavailable,
}

impl From<TransportError> for AppError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::InvalidRequest(msg) => AppError::InvalidInput(msg),
            other => AppError::NetworkUnavailable(other.to_string()),
        }
    }
}
