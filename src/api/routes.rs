//! API 路由配置
//!
//! 资金相关路由按子系统拆分挂载在 /v1 下。

use actix_web::web;

use super::attribution::{get_current_attribution, post_click};
use super::health::get_health;
use super::invites::post_redeem;
use super::payouts::{get_payout_batch, post_payout_batch, post_request_payout};
use super::referrals::{post_approve_due, post_approve_referral, post_conversion};
use super::refunds::{get_order_refunds, post_refund};
use super::webhooks::post_provider_event;

/// 退款路由 `/refunds` + `/orders/{id}/refunds`
pub fn refund_routes() -> actix_web::Scope {
    web::scope("/refunds").route("", web::post().to(post_refund))
}

pub fn order_routes() -> actix_web::Scope {
    web::scope("/orders").route("/{id}/refunds", web::get().to(get_order_refunds))
}

/// 归因路由 `/attribution`
pub fn attribution_routes() -> actix_web::Scope {
    web::scope("/attribution")
        .route("/clicks", web::post().to(post_click))
        .route("/current", web::get().to(get_current_attribution))
}

/// 邀请路由 `/invites`
pub fn invite_routes() -> actix_web::Scope {
    web::scope("/invites").route("/redeem", web::post().to(post_redeem))
}

/// 返佣路由 `/referrals`
pub fn referral_routes() -> actix_web::Scope {
    web::scope("/referrals")
        .route("/conversions", web::post().to(post_conversion))
        .route("/approve-due", web::post().to(post_approve_due))
        .route("/{id}/approve", web::post().to(post_approve_referral))
}

/// 批量支付路由 `/payouts`
pub fn payout_routes() -> actix_web::Scope {
    web::scope("/payouts")
        .route("/batches", web::post().to(post_payout_batch))
        .route("/batches/{id}", web::get().to(get_payout_batch))
        .route("/request/{affiliate_id}", web::post().to(post_request_payout))
}

/// webhook 路由 `/webhooks`
pub fn webhook_routes() -> actix_web::Scope {
    web::scope("/webhooks").route("/provider", web::post().to(post_provider_event))
}

/// 健康检查路由 `/health`
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health").route("", web::get().to(get_health))
}
