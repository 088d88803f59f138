//! Domain models shared by the ledger, services and storage backend.
//!
//! All monetary amounts are integers in minor currency units. Status
//! fields are closed enumerations validated at the boundary, never
//! free-form strings compared at call sites.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// 订单履约状态
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// 已付款等价状态（可以发起退款的状态）
    pub fn is_paid_equivalent(&self) -> bool {
        matches!(self, Self::Paid | Self::Shipped | Self::Delivered)
    }
}

/// 派生的订单支付状态，见 `crate::ledger::payment_status`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
    PartiallyRefunded,
    RefundPending,
    RefundFailed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Processed,
    Rejected,
    Failed,
}

impl RefundStatus {
    /// 占用可退款额度的状态（rejected/failed 不占用，允许重试）
    pub fn counts_against_refundable(&self) -> bool {
        matches!(self, Self::Pending | Self::Processed)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundSource {
    Processor,
    Manual,
}

/// 退款原因码（封闭枚举，入口处校验）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundReason {
    Duplicate,
    Fraudulent,
    RequestedByCustomer,
    ProductIssue,
    Other,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AffiliateStatus {
    Active,
    Suspended,
    Closed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Approved,
    Paid,
    Reversed,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: i64,
    pub currency: String,
    pub payment_ref: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub order_id: String,
    pub amount: i64,
    pub status: RefundStatus,
    pub source: RefundSource,
    pub provider_ref: Option<String>,
    pub reason_code: Option<RefundReason>,
    pub raw_provider_status: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Affiliate {
    pub id: String,
    pub code: String,
    pub display_name: String,
    pub status: AffiliateStatus,
    pub commission_rate: f64,
    pub commission_flat: Option<i64>,
    pub total_earnings: i64,
    pub pending_balance: i64,
    pub paid_balance: i64,
    pub click_count: i64,
    pub payout_account: Option<String>,
    pub payouts_enabled: bool,
    pub min_payout_override: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Affiliate {
    /// 已批准未支付余额，永远派生计算，不冗余存储
    pub fn approved_unpaid_balance(&self) -> i64 {
        self.total_earnings - self.pending_balance - self.paid_balance
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateClick {
    pub id: i64,
    pub affiliate_id: String,
    pub session_id: String,
    pub ip_hash: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateInvite {
    pub id: String,
    pub invite_code: String,
    pub target_email: Option<String>,
    pub target_phone: Option<String>,
    pub max_uses: Option<i32>,
    pub times_used: i32,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
    pub used_by_affiliate_id: Option<String>,
    pub used_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliateReferral {
    pub id: String,
    pub affiliate_id: String,
    pub order_id: String,
    pub order_amount: i64,
    pub commission_rate: f64,
    pub commission_amount: i64,
    pub status: ReferralStatus,
    pub payout_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub approved_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffiliatePayout {
    pub id: String,
    pub affiliate_id: String,
    pub batch_id: String,
    pub amount: i64,
    pub status: PayoutStatus,
    pub transfer_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub initiator: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
