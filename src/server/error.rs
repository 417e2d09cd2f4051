//! HTTP error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::ids::IdParseError;
use crate::session::SessionError;

/// Request errors reported back to the client
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing {0} parameter")]
    MissingParameter(&'static str),

    #[error("invalid {param}: {source}")]
    InvalidParameter {
        param: &'static str,
        #[source]
        source: IdParseError,
    },

    #[error("stream could not be opened: {0}")]
    Session(SessionError),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::MissingUserId => ApiError::MissingParameter("id"),
            SessionError::InvalidUserId(source) => ApiError::InvalidParameter { param: "id", source },
            other => ApiError::Session(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::InvalidParameter { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
