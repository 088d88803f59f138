//! 供应商 webhook 入口
//!
//! 先按事件 id 去重（插入 processed-event 集合，冲突即重复投递），
//! 再应用结算。重复投递应答 200，供应商才会停止重试。

use std::sync::Arc;

use actix_web::{web, Responder, Result as ActixResult};
use tracing::{debug, trace, warn};

use crate::services::RefundService;
use crate::storage::SeaOrmStorage;

use super::helpers::{error_from_moneta, error_from_refund, success_response};
use super::types::WebhookEvent;

/// POST /webhooks/provider — 异步结算事件
pub async fn post_provider_event(
    payload: web::Json<WebhookEvent>,
    storage: web::Data<Arc<SeaOrmStorage>>,
    refund_service: web::Data<Arc<RefundService>>,
) -> ActixResult<impl Responder> {
    let event = payload.into_inner();
    trace!("Webhook: event {} ({})", event.id, event.event_type);

    let fresh = match storage.claim_webhook_event(&event.id).await {
        Ok(fresh) => fresh,
        Err(e) => return Ok(error_from_moneta(&e)),
    };
    if !fresh {
        debug!("Webhook event {} already processed", event.id);
        return Ok(success_response(serde_json::json!({ "duplicate": true })));
    }

    if event.event_type != "refund.updated" {
        debug!("Webhook event type '{}' ignored", event.event_type);
        return Ok(success_response(serde_json::json!({ "ignored": true })));
    }

    let (Some(refund_id), Some(status)) = (&event.data.refund_id, &event.data.status) else {
        warn!("Webhook event {} missing refund_id/status", event.id);
        return Ok(success_response(serde_json::json!({ "ignored": true })));
    };

    match refund_service.apply_settlement(refund_id, status).await {
        Ok(Some(outcome)) => Ok(success_response(serde_json::json!({
            "settled": true,
            "refund": outcome.refund,
            "payment_status": outcome.payment_status,
        }))),
        Ok(None) => Ok(success_response(serde_json::json!({ "settled": false }))),
        Err(e) => Ok(error_from_refund(&e)),
    }
}
