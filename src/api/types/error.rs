//! HTTP rendering of typed errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::action::ErrorEnvelope;
use crate::domain::TypedError;

impl IntoResponse for TypedError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ErrorEnvelope { error: self })).into_response()
    }
}
