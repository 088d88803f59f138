//! 健康检查

use std::sync::Arc;

use actix_web::{web, Responder, Result as ActixResult};

use crate::storage::SeaOrmStorage;

use super::error_code::ErrorCode;
use super::helpers::{error_response, success_response};
use actix_web::http::StatusCode;

/// GET /health — 数据库连通性
pub async fn get_health(storage: web::Data<Arc<SeaOrmStorage>>) -> ActixResult<impl Responder> {
    match storage.ping().await {
        Ok(()) => Ok(success_response(serde_json::json!({
            "status": "ok",
            "backend": storage.backend_name(),
        }))),
        Err(e) => Ok(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ServiceUnavailable,
            &e.format_simple(),
        )),
    }
}
