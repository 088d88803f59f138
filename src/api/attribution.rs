//! 归因 API
//!
//! 点击上报 + 归因 cookie 的签发与读取。cookie 为不透明 base64，
//! 未签名是明确的产品决策；首次点击在窗口内胜出。

use std::sync::Arc;

use actix_web::{web, HttpRequest, Responder, Result as ActixResult};
use tracing::trace;

use crate::services::{AttributionService, ClickContext};

use super::helpers::{error_from_track, success_response};
use super::types::{ClickResponse, PostClick};

/// 归因 cookie 名称
pub const ATTRIBUTION_COOKIE: &str = "moneta_aff";

/// POST /attribution/clicks — 记录一次点击
pub async fn post_click(
    req: HttpRequest,
    payload: web::Json<PostClick>,
    attribution: web::Data<Arc<AttributionService>>,
) -> ActixResult<impl Responder> {
    let payload = payload.into_inner();
    trace!("Attribution API: click for code '{}'", payload.code);

    let ip = req
        .connection_info()
        .realip_remote_addr()
        .map(String::from);
    let context = ClickContext {
        ip,
        utm_source: payload.utm_source,
        utm_medium: payload.utm_medium,
        utm_campaign: payload.utm_campaign,
    };

    let tracked = match attribution.track_click(&payload.code, &context).await {
        Ok(tracked) => tracked,
        Err(e) => return Ok(error_from_track(&e)),
    };

    let existing = req
        .cookie(ATTRIBUTION_COOKIE)
        .map(|c| c.value().to_string());
    let cookie = AttributionService::cookie_to_set(existing.as_deref(), &tracked);

    Ok(success_response(ClickResponse {
        affiliate_id: tracked.affiliate_id,
        session_id: tracked.session_id,
        cookie,
    }))
}

/// GET /attribution/current — 读取请求携带的归因（无归因不是错误）
pub async fn get_current_attribution(req: HttpRequest) -> ActixResult<impl Responder> {
    let raw = req
        .cookie(ATTRIBUTION_COOKIE)
        .map(|c| c.value().to_string());
    let attribution = AttributionService::current_attribution(raw.as_deref());
    Ok(success_response(serde_json::json!({
        "attribution": attribution,
    })))
}
