//! 批量支付 API

use std::sync::Arc;

use actix_web::{web, Responder, Result as ActixResult};
use tracing::trace;

use crate::services::{BatchOptions, PayoutService};

use super::helpers::{error_from_moneta, success_response};
use super::types::PostPayoutBatch;

/// POST /payouts/batches — 触发一次批量支付
pub async fn post_payout_batch(
    payload: web::Json<PostPayoutBatch>,
    payouts: web::Data<Arc<PayoutService>>,
) -> ActixResult<impl Responder> {
    let payload = payload.into_inner();
    trace!(
        "Payout API: batch trigger by {} (dry_run: {})",
        payload.initiator, payload.dry_run
    );

    let options = BatchOptions {
        dry_run: payload.dry_run,
        initiator: payload.initiator,
        batch_id: payload.batch_id,
    };

    match payouts.run_payout_batch(options).await {
        Ok(summary) => Ok(success_response(summary)),
        Err(e) => Ok(error_from_moneta(&e)),
    }
}

/// GET /payouts/batches/{id} — 批次查询
pub async fn get_payout_batch(
    path: web::Path<String>,
    payouts: web::Data<Arc<PayoutService>>,
) -> ActixResult<impl Responder> {
    let batch_id = path.into_inner();
    match payouts.get_batch(&batch_id).await {
        Ok(lookup) => Ok(success_response(lookup)),
        Err(e) => Ok(error_from_moneta(&e)),
    }
}

/// POST /payouts/request/{affiliate_id} — 客户侧单笔提现请求
pub async fn post_request_payout(
    path: web::Path<String>,
    payouts: web::Data<Arc<PayoutService>>,
) -> ActixResult<impl Responder> {
    let affiliate_id = path.into_inner();
    match payouts.request_payout(&affiliate_id, "customer").await {
        Ok(summary) => Ok(success_response(summary)),
        Err(e) => Ok(error_from_moneta(&e)),
    }
}
