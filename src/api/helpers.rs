//! API 帮助函数

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;

use crate::errors::MonetaError;
use crate::services::{RefundError, TrackError};

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 RefundError 构建错误响应（自带 HTTP 状态与稳定码）
pub fn error_from_refund(err: &RefundError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, ErrorCode::from_service_code(err.code), &err.message)
}

/// 从 TrackError 构建错误响应
pub fn error_from_track(err: &TrackError) -> HttpResponse {
    let status = StatusCode::from_u16(err.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, ErrorCode::from_service_code(err.code), &err.message)
}

/// 从 MonetaError 构建错误响应
pub fn error_from_moneta(err: &MonetaError) -> HttpResponse {
    let (status, code) = match err {
        MonetaError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NotFound),
        MonetaError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadRequest),
        MonetaError::ProviderUnconfigured(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::ProviderUnconfigured)
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalServerError),
    };
    error_response(status, code, err.message())
}
