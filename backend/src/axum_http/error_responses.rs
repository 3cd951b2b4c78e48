use axum::{Json, http::StatusCode, response::Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

/// Uniform error body for every router; internal detail stays in the logs.
pub fn error_response(status: StatusCode, message: String) -> Response {
    use axum::response::IntoResponse;

    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        "Internal server error".to_string()
    } else {
        message
    };

    (
        status,
        Json(ErrorResponse {
            code: status.as_u16(),
            message,
        }),
    )
        .into_response()
}
