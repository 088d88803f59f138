//! 退款 API

use std::sync::Arc;

use actix_web::{web, Responder, Result as ActixResult};
use tracing::trace;

use crate::services::{RefundRequest, RefundService};
use crate::storage::SeaOrmStorage;

use super::helpers::{error_from_moneta, error_from_refund, success_response};
use super::types::PostRefund;

/// POST /refunds — 创建退款（processor 或 manual）
pub async fn post_refund(
    payload: web::Json<PostRefund>,
    refund_service: web::Data<Arc<RefundService>>,
) -> ActixResult<impl Responder> {
    let payload = payload.into_inner();
    trace!(
        "Refund API: create request for order {} (amount {}, source {:?})",
        payload.order_id, payload.amount, payload.source
    );

    let request = RefundRequest {
        order_id: payload.order_id,
        amount: payload.amount,
        reason_code: payload.reason_code,
        actor: payload.actor.unwrap_or_else(|| "api".to_string()),
    };

    let result = match payload.source.as_deref() {
        Some("manual") => refund_service.create_manual_refund(request).await,
        _ => refund_service.create_processor_refund(request).await,
    };

    match result {
        Ok(outcome) => Ok(success_response(serde_json::json!({
            "refund": outcome.refund,
            "payment_status": outcome.payment_status,
        }))),
        Err(e) => Ok(error_from_refund(&e)),
    }
}

/// GET /orders/{id}/refunds — 订单的退款集合与派生摘要
pub async fn get_order_refunds(
    path: web::Path<String>,
    storage: web::Data<Arc<SeaOrmStorage>>,
) -> ActixResult<impl Responder> {
    let order_id = path.into_inner();

    let order = match storage.get_order(&order_id).await {
        Ok(Some(order)) => order,
        Ok(None) => {
            return Ok(error_from_moneta(&crate::errors::MonetaError::not_found(
                format!("order {} not found", order_id),
            )));
        }
        Err(e) => return Ok(error_from_moneta(&e)),
    };

    let refunds = match storage.load_refunds(&order_id).await {
        Ok(refunds) => refunds,
        Err(e) => return Ok(error_from_moneta(&e)),
    };

    let summary = crate::ledger::refund_summary(&order, &refunds);
    Ok(success_response(serde_json::json!({
        "refunds": refunds,
        "summary": summary,
        "refundable_amount": crate::ledger::refundable_amount(&order, &refunds),
    })))
}
