// Copyright 2026 S4Core Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! API errors and their HTTP responses.
//!
//! Every failure is rendered as a JSON body carrying a stable code, a
//! generic message and a request id. Backend diagnostics are only logged.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use s3gate_core::{BackendError, ErrorKind};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use uuid::Uuid;

/// Header carrying the id of a failed request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Gateway API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    /// A required query parameter or form field is absent or empty.
    #[error("MissingParameter: required parameter '{0}' is missing")]
    MissingParameter(&'static str),

    /// The request is malformed.
    #[error("InvalidRequest: {0}")]
    InvalidRequest(String),

    /// The storage backend reported a failure.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Gateway-side failure not caused by the backend.
    #[error("InternalError: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the error code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter(_) => "MissingParameter",
            ApiError::InvalidRequest(_) => "InvalidRequest",
            ApiError::Backend(e) => e.kind().as_str(),
            ApiError::Internal(_) => "Internal",
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(e) => status_for_kind(e.kind()),
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            ApiError::MissingParameter(_) | ApiError::InvalidRequest(_) => self.to_string(),
            ApiError::Backend(e) => match e.kind() {
                ErrorKind::NotFound => "The specified bucket or object does not exist",
                ErrorKind::Conflict => "The request conflicts with the current bucket state",
                ErrorKind::InvalidArgument => "The storage backend rejected the request",
                ErrorKind::Auth => "Access to the storage backend was denied",
                ErrorKind::Network => "The storage backend is unreachable",
                ErrorKind::Internal => "Internal error",
            }
            .to_string(),
            ApiError::Internal(_) => "Internal error".to_string(),
        }
    }
}

/// Maps a backend error kind to an HTTP status.
pub fn status_for_kind(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::Auth => StatusCode::FORBIDDEN,
        ErrorKind::Network | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let status = self.status_code();

        if status.is_server_error() {
            error!(request_id = %request_id, "{}", self);
        } else {
            warn!(request_id = %request_id, "{}", self);
        }

        let body = json!({
            "code": self.code(),
            "message": self.public_message(),
            "requestId": request_id,
        });

        let mut response = (status, Json(body)).into_response();
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(status_for_kind(ErrorKind::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for_kind(ErrorKind::Conflict), StatusCode::BAD_REQUEST);
        assert_eq!(status_for_kind(ErrorKind::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(status_for_kind(ErrorKind::Auth), StatusCode::FORBIDDEN);
        assert_eq!(
            status_for_kind(ErrorKind::Network),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for_kind(ErrorKind::Internal),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ApiError::MissingParameter("bucket").code(), "MissingParameter");
        assert_eq!(
            ApiError::from(BackendError::conflict("BucketNotEmpty")).code(),
            "Conflict"
        );
    }

    #[test]
    fn test_public_message_hides_backend_text() {
        let err = ApiError::from(BackendError::auth("InvalidAccessKeyId: AKIA1234"));
        assert!(!err.public_message().contains("AKIA1234"));
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
