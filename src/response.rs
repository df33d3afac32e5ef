//! Uniform `{code, message, data}` envelope wrapped around every JSON response.

use actix_web::{http::StatusCode, HttpResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Mirrors the HTTP status code.
    pub code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }
}

/// 200 response carrying `data`.
pub fn ok<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::success(data))
}

/// 200 response with `data: null`.
pub fn ok_empty() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::<()> {
        code: StatusCode::OK.as_u16(),
        message: "success".to_string(),
        data: None,
    })
}
