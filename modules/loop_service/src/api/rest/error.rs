//! HTTP error mapping to RFC-9457 Problem Details

use crate::contract::LoopError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// RFC-9457 Problem Details for HTTP API errors
#[derive(Debug, Serialize)]
pub struct Problem {
    /// A URI reference that identifies the problem type
    #[serde(rename = "type")]
    pub type_uri: String,

    /// A short, human-readable summary of the problem type
    pub title: String,

    /// The HTTP status code
    pub status: u16,

    /// A human-readable explanation specific to this occurrence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Problem {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            type_uri: format!("https://httpstatuses.io/{}", status.as_u16()),
            title: title.into(),
            status: status.as_u16(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Problem::new(StatusCode::UNAUTHORIZED, "Unauthorized").with_detail(detail)
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Problem::new(StatusCode::BAD_REQUEST, "Validation Error").with_detail(detail)
    }
}

impl IntoResponse for Problem {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            [(header::CONTENT_TYPE, "application/problem+json")],
            Json(self),
        )
            .into_response()
    }
}

/// Map domain errors to HTTP Problem Details
pub fn map_domain_error(error: LoopError) -> Problem {
    match error {
        LoopError::NotFound { resource, id } => {
            Problem::new(StatusCode::NOT_FOUND, format!("{resource} not found"))
                .with_detail(format!("{resource} with id '{id}' was not found"))
        }

        LoopError::Forbidden { reason } => {
            Problem::new(StatusCode::FORBIDDEN, "Forbidden").with_detail(reason)
        }

        LoopError::Validation { message } => Problem::bad_request(message),

        LoopError::Conflict { reason } => {
            Problem::new(StatusCode::CONFLICT, "Conflict").with_detail(reason)
        }

        LoopError::Internal => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
        )
        .with_detail("An unexpected error occurred"),
    }
}

impl From<LoopError> for Problem {
    fn from(error: LoopError) -> Self {
        map_domain_error(error)
    }
}
