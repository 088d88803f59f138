//! 支付供应商接入层
//!
//! 退款创建与资金转账走同一个供应商抽象：
//! - `PaymentProvider` trait：幂等键贯穿所有外呼
//! - HTTP 实现：进程级 ureq Agent + spawn_blocking
//! - 凭据解析缓存：带 TTL 与显式失效钩子，test/live 错配时拒绝工作

mod client;
mod config_cache;
mod http;

pub use client::{
    CreateRefundParams, CreateTransferParams, PaymentProvider, ProviderError, ProviderRefund,
    ProviderTransfer,
};
pub use config_cache::{ProviderConfigResolver, ProviderMode, ResolvedProviderConfig};
pub use http::HttpPaymentProvider;
