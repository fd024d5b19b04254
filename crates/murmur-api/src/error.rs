use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use murmur_db::unique_violation;
use murmur_types::api::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad or missing input. The message is shown to the client verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("User with this username already exists.")]
    DuplicateUsername,

    /// Unknown username and wrong password share this variant.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Unauthorized - invalid or missing token")]
    Unauthenticated,

    #[error("token key collided with an existing key")]
    TokenCollision,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Classifies a failed store write: uniqueness on a username or a token
    /// key becomes the matching domain error, anything else is internal.
    pub fn from_store(err: anyhow::Error) -> Self {
        match unique_violation(&err).as_deref() {
            Some("members.username") => Self::DuplicateUsername,
            Some("tokens.key") => Self::TokenCollision,
            _ => Self::Internal(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::DuplicateUsername | Self::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::TokenCollision | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = if status.is_server_error() {
            error!("Request failed: {:#}", self);
            "Internal server error.".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

/// Run blocking store work (SQLite, Argon2) off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}
