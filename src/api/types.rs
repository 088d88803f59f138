//! API 类型定义

use serde::{Deserialize, Serialize};

/// 统一响应信封
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

/// 退款创建请求体（processor 与 manual 共用）
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostRefund {
    pub order_id: String,
    pub amount: i64,
    pub reason_code: Option<String>,
    /// processor（默认）或 manual
    pub source: Option<String>,
    pub actor: Option<String>,
}

/// 点击上报请求体
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostClick {
    pub code: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct ClickResponse {
    pub affiliate_id: String,
    pub session_id: String,
    /// 仅在需要写入新 cookie 时返回（首次点击胜出）
    pub cookie: Option<String>,
}

/// 邀请兑换请求体
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostRedeem {
    pub invite_id: String,
    pub affiliate_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub metadata: Option<String>,
}

/// 兑换响应：失败是并发下的常规结果，用布尔承载而不是异常
#[derive(Serialize, Clone, Debug)]
pub struct RedeemResponse {
    pub success: bool,
    pub error: Option<String>,
    pub invite: Option<crate::storage::models::AffiliateInvite>,
}

/// 转化记录请求体
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostConversion {
    pub order_id: String,
    /// 缺省时从归因 cookie 中取
    pub affiliate_id: Option<String>,
}

/// 批量支付触发请求体
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PostPayoutBatch {
    #[serde(default)]
    pub dry_run: bool,
    pub initiator: String,
    pub batch_id: Option<String>,
}

/// 供应商 webhook 事件（异步结算）
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WebhookEventData {
    /// 供应商侧退款 id
    pub refund_id: Option<String>,
    pub status: Option<String>,
}
