use serde_json::{json, Value};

pub type ApiResult<T> = Result<T, ApiError>;

pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response from {endpoint} at {path}: {detail}")]
    Schema {
        endpoint: String,
        path: String,
        detail: String,
    },

    #[error("not signed in")]
    NotSignedIn,

    #[error("invalid request: {0}")]
    Invalid(String),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Network(_) => "network_error",
            ApiError::Unauthorized { .. } => "unauthorized",
            ApiError::Rejected { .. } => "backend_rejected",
            ApiError::Schema { .. } => "schema_mismatch",
            ApiError::NotSignedIn => "not_signed_in",
            ApiError::Invalid(_) => "bad_params",
        }
    }

    /// Text for a blocking dialog: the backend's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { message, .. } | ApiError::Rejected { message, .. }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            ApiError::Unauthorized { .. } => "Your session has expired. Please sign in again.".to_string(),
            ApiError::NotSignedIn => "Please sign in first.".to_string(),
            ApiError::Invalid(m) => m.clone(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            ApiError::Network(m) => Some(json!({ "cause": m })),
            ApiError::Unauthorized { status, .. } | ApiError::Rejected { status, .. } => {
                Some(json!({ "status": status }))
            }
            ApiError::Schema {
                endpoint,
                path,
                detail,
            } => Some(json!({ "endpoint": endpoint, "path": path, "detail": detail })),
            ApiError::NotSignedIn | ApiError::Invalid(_) => None,
        }
    }

    /// Same shape as an IPC error object, for embedding in partial results.
    pub fn to_json(&self) -> Value {
        let mut v = json!({
            "code": self.code(),
            "message": self.user_message(),
        });
        if let Some(d) = self.details() {
            v["details"] = d;
        }
        v
    }
}
