//! 统一 API 错误码定义

use serde_repr::{Deserialize_repr, Serialize_repr};

/// API 错误码枚举
///
/// 使用 serde_repr 序列化为数字，按千位分域：
/// - 0: 成功
/// - 1000-1099: 通用错误
/// - 2000-2099: 退款错误
/// - 3000-3099: 归因错误
/// - 4000-4099: 邀请错误
/// - 5000-5099: 返佣错误
/// - 6000-6099: 批量支付错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    ServiceUnavailable = 1030,

    // 退款错误 2000-2099
    OrderNotFound = 2000,
    OrderNotPaid = 2001,
    NotProcessorPaid = 2002,
    InvalidAmount = 2003,
    InvalidReasonCode = 2004,
    ExceedsRefundable = 2005,
    ProviderError = 2010,
    ProviderTimeout = 2011,
    ProviderUnconfigured = 2012,

    // 归因错误 3000-3099
    InvalidAffiliateCode = 3000,
    AffiliateNotActive = 3001,

    // 邀请错误 4000-4099
    InviteNotFound = 4000,
    InviteExhausted = 4001,
    InviteExpired = 4002,
    InviteIdentityMismatch = 4003,

    // 返佣错误 5000-5099
    ReferralNotFound = 5000,
    ConversionRejected = 5001,

    // 批量支付错误 6000-6099
    PayoutBatchNotFound = 6000,
    PayoutNotEligible = 6001,
}

impl ErrorCode {
    /// 服务层稳定字符串码 → 数字错误码
    pub fn from_service_code(code: &str) -> Self {
        match code {
            "ORDER_NOT_FOUND" => Self::OrderNotFound,
            "ORDER_NOT_PAID" => Self::OrderNotPaid,
            "NOT_PROCESSOR_PAID" => Self::NotProcessorPaid,
            "INVALID_AMOUNT" => Self::InvalidAmount,
            "INVALID_REASON_CODE" => Self::InvalidReasonCode,
            "EXCEEDS_REFUNDABLE" => Self::ExceedsRefundable,
            "PROVIDER_ERROR" => Self::ProviderError,
            "PROVIDER_TIMEOUT" => Self::ProviderTimeout,
            "PROVIDER_UNCONFIGURED" => Self::ProviderUnconfigured,
            "INVALID_CODE" => Self::InvalidAffiliateCode,
            "NOT_ACTIVE" => Self::AffiliateNotActive,
            "INVITE_NOT_FOUND" => Self::InviteNotFound,
            "INVITE_EXHAUSTED" => Self::InviteExhausted,
            "INVITE_EXPIRED" => Self::InviteExpired,
            "INVITE_IDENTITY_MISMATCH" => Self::InviteIdentityMismatch,
            _ => Self::InternalServerError,
        }
    }
}
