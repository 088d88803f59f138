//! 业务服务层
//!
//! 六个资金相关子系统的编排逻辑，存储层负责原子性，供应商层负责
//! 幂等外呼，这里只做校验、编排与结果分类。

mod attribution_service;
mod commission_service;
mod invite_service;
mod payout_service;
pub mod provider;
mod refund_service;

pub use attribution_service::{
    AttributionCookie, AttributionService, ClickContext, TrackError, TrackedClick,
};
pub use commission_service::{commission_for, CommissionService, ConversionOutcome};
pub use invite_service::{InviteService, RedeemIdentity, RedeemOutcome};
pub use payout_service::{BatchLookup, BatchOptions, BatchSummary, PayoutService};
pub use refund_service::{
    normalize_provider_status, RefundError, RefundOutcome, RefundRequest, RefundService,
};
