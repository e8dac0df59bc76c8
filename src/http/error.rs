//! Maps [`ScimError`] to an HTTP response carrying the RFC 7644 error body
//! shape (spec §4.1.5, §6.4).

use crate::error::ScimError;
use crate::protocol::error_response::ErrorBody;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub struct HttpScimError(pub ScimError);

impl From<ScimError> for HttpScimError {
    fn from(err: ScimError) -> Self {
        HttpScimError(err)
    }
}

impl IntoResponse for HttpScimError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody::from_error(&self.0);
        (status, Json(body)).into_response()
    }
}
