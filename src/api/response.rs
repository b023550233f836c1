use serde::Serialize;
use axum::Json;
use axum::http::StatusCode;
use chrono::Utc;

use crate::error::AppError;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub data: Option<T>,
    pub meta: ResponseMeta,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    pub status: &'static str,
    pub status_code: u16,
    pub timestamp: String,
    pub message: Option<String>,
}

pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn reply<T>(status: StatusCode, data: Option<T>, message: Option<String>) -> Reply<T> {
    let meta = ResponseMeta {
        status: if status.is_success() { "success" } else { "error" },
        status_code: status.as_u16(),
        timestamp: Utc::now().to_rfc3339(),
        message,
    };

    (status, Json(ApiResponse { data, meta }))
}

pub fn success<T: Serialize>(data: T) -> Reply<T> {
    reply(StatusCode::OK, Some(data), None)
}

pub fn error<T>(status: StatusCode, message: String) -> Reply<T> {
    reply(status, None, Some(message))
}

/// Error reply for a failed request; the status follows the error's class.
pub fn failure<T>(err: &AppError) -> Reply<T> {
    error(err.status_code(), err.to_string())
}
