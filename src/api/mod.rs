//! HTTP API 层
//!
//! 该模块包含资金核心对外的所有端点：
//! - 退款创建与订单退款查询
//! - 点击归因与 cookie 签发
//! - 邀请兑换
//! - 转化记录与返佣审批
//! - 批量支付触发与查询
//! - 供应商 webhook 与健康检查

mod attribution;
pub mod error_code;
mod health;
mod helpers;
mod invites;
mod payouts;
mod referrals;
mod refunds;
pub mod routes;
mod types;
mod webhooks;

pub use attribution::ATTRIBUTION_COOKIE;
pub use error_code::ErrorCode;
pub use helpers::{error_response, success_response};
pub use types::*;
