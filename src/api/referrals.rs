//! 返佣 API

use std::sync::Arc;

use actix_web::{web, HttpRequest, Responder, Result as ActixResult};
use tracing::trace;

use crate::services::{AttributionService, CommissionService, ConversionOutcome};

use super::attribution::ATTRIBUTION_COOKIE;
use super::helpers::{error_from_moneta, success_response};
use super::types::PostConversion;

/// POST /referrals/conversions — 记录一次归因转化
///
/// affiliate_id 缺省时从请求携带的归因 cookie 取；两者都没有按
/// 无归因处理，不产生返佣。重复投递是幂等空操作。
pub async fn post_conversion(
    req: HttpRequest,
    payload: web::Json<PostConversion>,
    commissions: web::Data<Arc<CommissionService>>,
) -> ActixResult<impl Responder> {
    let payload = payload.into_inner();
    trace!("Referral API: conversion for order {}", payload.order_id);

    let affiliate_id = payload.affiliate_id.or_else(|| {
        let raw = req
            .cookie(ATTRIBUTION_COOKIE)
            .map(|c| c.value().to_string());
        AttributionService::current_attribution(raw.as_deref()).map(|a| a.affiliate_id)
    });

    let Some(affiliate_id) = affiliate_id else {
        return Ok(success_response(serde_json::json!({
            "recorded": false,
            "reason": "no attribution",
        })));
    };

    match commissions
        .record_conversion(&payload.order_id, &affiliate_id)
        .await
    {
        Ok(outcome) => {
            let recorded = matches!(outcome, ConversionOutcome::Recorded(_));
            Ok(success_response(serde_json::json!({
                "recorded": recorded,
                "referral": outcome.referral(),
            })))
        }
        Err(e) => Ok(error_from_moneta(&e)),
    }
}

/// POST /referrals/{id}/approve — 管理员手动批准
pub async fn post_approve_referral(
    path: web::Path<String>,
    commissions: web::Data<Arc<CommissionService>>,
) -> ActixResult<impl Responder> {
    let referral_id = path.into_inner();
    match commissions.approve_referral(&referral_id).await {
        Ok(approved) => Ok(success_response(serde_json::json!({ "approved": approved }))),
        Err(e) => Ok(error_from_moneta(&e)),
    }
}

/// POST /referrals/approve-due — 批准所有超过审批窗口的返佣
pub async fn post_approve_due(
    commissions: web::Data<Arc<CommissionService>>,
) -> ActixResult<impl Responder> {
    match commissions.approve_due_referrals().await {
        Ok(count) => Ok(success_response(serde_json::json!({ "approved": count }))),
        Err(e) => Ok(error_from_moneta(&e)),
    }
}
