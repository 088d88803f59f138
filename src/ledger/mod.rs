//! Money ledger primitives
//!
//! Pure, deterministic functions deriving refund capacity and payment
//! status from an order and its full refund set. Zero I/O by design so
//! every branch is unit-testable against literal fixtures.

use serde::{Deserialize, Serialize};

use crate::storage::models::{Order, PaymentStatus, Refund, RefundStatus};

/// 剩余可退款金额
///
/// processed/pending 占用额度，rejected/failed 不占用（失败的尝试可以
/// 重试而不被重复计入），下限为零。
pub fn refundable_amount(order: &Order, refunds: &[Refund]) -> i64 {
    let committed: i64 = refunds
        .iter()
        .filter(|r| r.status.counts_against_refundable())
        .map(|r| r.amount)
        .sum();
    (order.total_amount - committed).max(0)
}

/// 已成功退款金额（仅 processed）
pub fn refunded_amount(refunds: &[Refund]) -> i64 {
    refunds
        .iter()
        .filter(|r| r.status == RefundStatus::Processed)
        .map(|r| r.amount)
        .sum()
}

/// 派生支付状态
///
/// 状态函数而非存储标志，保证始终与退款集合一致。判定顺序：
/// 1. 未收款且状态未达已付款等价 → unpaid
/// 2. 无退款 → paid
/// 3. processed 总额 >= 订单总额 → refunded
/// 4. 存在 pending → refund_pending（pending 压过 partial：未决退款
///    仍可能完成并改变最终归类）
/// 5. 0 < processed < total → partially_refunded
/// 6. 全部 failed/rejected 且无 processed → refund_failed
/// 7. 兜底 → paid
pub fn payment_status(order: &Order, refunds: &[Refund]) -> PaymentStatus {
    if order.payment_ref.is_none() && !order.status.is_paid_equivalent() {
        return PaymentStatus::Unpaid;
    }

    if refunds.is_empty() {
        return PaymentStatus::Paid;
    }

    let processed = refunded_amount(refunds);
    let has_pending = refunds.iter().any(|r| r.status == RefundStatus::Pending);

    if processed >= order.total_amount {
        return PaymentStatus::Refunded;
    }
    if has_pending {
        return PaymentStatus::RefundPending;
    }
    if processed > 0 {
        return PaymentStatus::PartiallyRefunded;
    }

    let all_dead = refunds
        .iter()
        .all(|r| matches!(r.status, RefundStatus::Failed | RefundStatus::Rejected));
    if all_dead {
        return PaymentStatus::RefundFailed;
    }

    PaymentStatus::Paid
}

/// 退款汇总视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundSummary {
    pub payment_status: PaymentStatus,
    /// 仅 processed 金额
    pub refunded_amount: i64,
    pub refund_count: usize,
    pub latest_refund_status: Option<RefundStatus>,
}

/// 汇总订单的退款情况
///
/// "latest" 取创建时间最大的退款；并列时按 (created_at, id) 取最大，
/// 保证排序确定、测试可复现。
pub fn refund_summary(order: &Order, refunds: &[Refund]) -> RefundSummary {
    let latest_refund_status = refunds
        .iter()
        .max_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        })
        .map(|r| r.status);

    RefundSummary {
        payment_status: payment_status(order, refunds),
        refunded_amount: refunded_amount(refunds),
        refund_count: refunds.len(),
        latest_refund_status,
    }
}
