//! 邀请兑换 API
//!
//! 兑换失败（耗尽/过期）是并发下的常规结果，响应用
//! `{success:false, error}` 承载，HTTP 层保持 200。

use std::sync::Arc;

use actix_web::{web, Responder, Result as ActixResult};
use tracing::trace;

use crate::services::{InviteService, RedeemIdentity, RedeemOutcome};

use super::helpers::{error_from_moneta, success_response};
use super::types::{PostRedeem, RedeemResponse};

/// POST /invites/redeem — 兑换一次邀请
pub async fn post_redeem(
    payload: web::Json<PostRedeem>,
    invites: web::Data<Arc<InviteService>>,
) -> ActixResult<impl Responder> {
    let payload = payload.into_inner();
    trace!(
        "Invite API: redeem {} by affiliate {}",
        payload.invite_id, payload.affiliate_id
    );

    let identity = RedeemIdentity {
        email: payload.email,
        phone: payload.phone,
    };

    let outcome = match invites
        .redeem_invite(
            &payload.invite_id,
            &payload.affiliate_id,
            &identity,
            payload.metadata.as_deref(),
        )
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => return Ok(error_from_moneta(&e)),
    };

    let response = match outcome {
        RedeemOutcome::Redeemed(invite) => RedeemResponse {
            success: true,
            error: None,
            invite: Some(invite),
        },
        other => RedeemResponse {
            success: false,
            error: Some(other.code().to_string()),
            invite: None,
        },
    };

    Ok(success_response(response))
}
