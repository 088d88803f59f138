//! 供应商调用抽象
//!
//! 所有外呼都携带幂等键：超时（结果未知）之后按同一个键重试
//! 不会在供应商侧产生第二笔退款/转账。

use std::fmt;

use async_trait::async_trait;

use crate::storage::models::RefundReason;

/// 退款创建参数
#[derive(Debug, Clone)]
pub struct CreateRefundParams {
    /// 供应商侧的支付（charge/payment intent）引用
    pub payment_ref: String,
    pub amount: i64,
    pub reason_code: Option<RefundReason>,
    pub idempotency_key: String,
}

/// 供应商退款返回值，status 为供应商原始字符串
#[derive(Debug, Clone)]
pub struct ProviderRefund {
    pub id: String,
    pub status: String,
}

/// 转账创建参数
#[derive(Debug, Clone)]
pub struct CreateTransferParams {
    pub amount: i64,
    pub currency: String,
    pub destination_account: String,
    pub metadata: serde_json::Value,
    pub idempotency_key: String,
}

#[derive(Debug, Clone)]
pub struct ProviderTransfer {
    pub id: String,
    pub status: String,
}

/// 供应商调用错误
///
/// Timeout 与 Rejected 严格区分：超时意味着结果未知，调用方可以
/// 拿同一个幂等键重试；Rejected 是供应商明确拒绝，重试无意义。
#[derive(Debug, Clone)]
pub enum ProviderError {
    /// 请求超时，供应商侧结果未知
    Timeout(String),
    /// 供应商明确拒绝（4xx/5xx 带状态码）
    Rejected { status: u16, message: String },
    /// 网络/序列化等传输层失败
    Transport(String),
    /// 凭据缺失或 test/live 模式错配，拒绝工作
    Unconfigured(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(msg) => write!(f, "provider call timed out (outcome unknown): {}", msg),
            Self::Rejected { status, message } => {
                write!(f, "provider rejected the request ({}): {}", status, message)
            }
            Self::Transport(msg) => write!(f, "provider transport failure: {}", msg),
            Self::Unconfigured(msg) => write!(f, "provider is not configured: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// 支付/转账供应商抽象
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// 对一笔已付款发起退款
    async fn create_refund(&self, params: CreateRefundParams)
        -> Result<ProviderRefund, ProviderError>;

    /// 向联盟成员的外部账户发起转账
    async fn create_transfer(
        &self,
        params: CreateTransferParams,
    ) -> Result<ProviderTransfer, ProviderError>;

    /// 实现名称（日志用）
    fn name(&self) -> &'static str;
}
