//! Error taxonomy shared by the store, the report generator, and the API.
//!
//! Entities outside the caller's scope are reported as [`Error::NotFound`],
//! never as a "forbidden" variant: foreign rows must be indistinguishable
//! from absent rows.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Entity absent, or present but owned by another therapist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Missing required field, invalid enum value, or empty selection.
    #[error("{0}")]
    Validation(String),

    /// Mutation rejected by the session lifecycle (e.g. closed session).
    #[error("{0}")]
    Conflict(&'static str),

    /// Bad or missing credentials.
    #[error("invalid credentials")]
    Auth,

    #[error(transparent)]
    Db(#[from] rusqlite::Error),

    #[error(transparent)]
    Render(#[from] minijinja::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Auth => StatusCode::UNAUTHORIZED,
            Error::Db(_) | Error::Render(_) | Error::Io(_) | Error::Other(_) => {
                // Full error stays server-side; clients get a generic message.
                tracing::error!("internal error: {}", self);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "internal server error" })),
                )
                    .into_response();
            }
        };

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
