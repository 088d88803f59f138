//! Refund writes
//!
//! The budget check and the insert run in one transaction that re-reads
//! the refund rows immediately before writing, so two refund requests
//! racing the same refundable budget cannot both slip through the local
//! check. The derived payment status is persisted in the same
//! transaction as the refund row.

use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::{refund_model_to_domain, refund_to_active_model};
use crate::errors::{MonetaError, Result};
use crate::ledger;
use crate::storage::models::{Order, PaymentStatus, Refund, RefundStatus};
use migration::entities::{order, refund};

/// 带预算保护的退款写入结果
#[derive(Debug, Clone)]
pub enum RefundWriteOutcome {
    Written {
        refund: Refund,
        new_payment_status: PaymentStatus,
    },
    /// 并发请求抢走了额度，未写入任何行
    ExceedsBudget { refundable: i64 },
}

async fn load_refunds_in<C: ConnectionTrait>(conn: &C, order_id: &str) -> Result<Vec<Refund>> {
    let models = refund::Entity::find()
        .filter(refund::Column::OrderId.eq(order_id))
        .order_by_asc(refund::Column::CreatedAt)
        .order_by_asc(refund::Column::Id)
        .all(conn)
        .await?;
    models.into_iter().map(refund_model_to_domain).collect()
}

async fn persist_status_in<C: ConnectionTrait>(
    conn: &C,
    order_id: &str,
    status: PaymentStatus,
) -> Result<()> {
    order::ActiveModel {
        id: Set(order_id.to_string()),
        payment_status: Set(status.as_ref().to_string()),
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .update(conn)
    .await?;
    Ok(())
}

impl SeaOrmStorage {
    /// 写入退款行并更新订单派生状态
    ///
    /// `enforce_budget` 为 true 时在事务内重读退款集合并再次校验额度
    /// （manual 路径）；processor 路径在调用供应商前已经校验过，供应商
    /// 侧退款已经存在，此处必须落库，不再二次拦截。
    pub async fn create_refund_guarded(
        &self,
        order: &Order,
        new_refund: &Refund,
        enforce_budget: bool,
    ) -> Result<RefundWriteOutcome> {
        let txn = self.db.begin().await?;

        // 事务内重读，紧贴插入
        let mut refunds = load_refunds_in(&txn, &order.id).await?;
        let refundable = ledger::refundable_amount(order, &refunds);

        if enforce_budget && new_refund.amount > refundable {
            txn.rollback().await?;
            debug!(
                "Refund for order {} lost the budget race (requested {}, refundable {})",
                order.id, new_refund.amount, refundable
            );
            return Ok(RefundWriteOutcome::ExceedsBudget { refundable });
        }

        refund::Entity::insert(refund_to_active_model(new_refund))
            .exec(&txn)
            .await
            .map_err(|e| {
                MonetaError::database_operation(format!(
                    "插入退款行失败 (order: {}): {}",
                    order.id, e
                ))
            })?;

        refunds.push(new_refund.clone());
        let new_payment_status = ledger::payment_status(order, &refunds);
        persist_status_in(&txn, &order.id, new_payment_status).await?;

        txn.commit().await?;

        info!(
            "Refund {} written for order {} ({} {}), payment_status -> {}",
            new_refund.id,
            order.id,
            new_refund.amount,
            order.currency,
            new_payment_status.as_ref()
        );

        Ok(RefundWriteOutcome::Written {
            refund: new_refund.clone(),
            new_payment_status,
        })
    }

    /// 异步结算：按供应商退款 id 将 pending 退款转为终态
    ///
    /// 仅 pending 行可被结算（幂等：重复投递的事件第二次匹配不到行）。
    /// 结算后在同一事务内重算并持久化订单支付状态。
    pub async fn settle_refund_by_provider_ref(
        &self,
        provider_ref: &str,
        new_status: RefundStatus,
        raw_provider_status: &str,
    ) -> Result<Option<Refund>> {
        let txn = self.db.begin().await?;

        let Some(model) = refund::Entity::find()
            .filter(refund::Column::ProviderRef.eq(provider_ref))
            .filter(refund::Column::Status.eq(RefundStatus::Pending.as_ref()))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut active: refund::ActiveModel = model.into();
        active.status = Set(new_status.as_ref().to_string());
        active.raw_provider_status = Set(Some(raw_provider_status.to_string()));
        let updated = active.update(&txn).await?;
        let settled = refund_model_to_domain(updated)?;

        let Some(order_model) = order::Entity::find_by_id(settled.order_id.clone())
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Err(MonetaError::not_found(format!(
                "退款 {} 指向不存在的订单 {}",
                settled.id, settled.order_id
            )));
        };
        let order_domain = super::converters::order_model_to_domain(order_model)?;

        let refunds = load_refunds_in(&txn, &order_domain.id).await?;
        let status = ledger::payment_status(&order_domain, &refunds);
        persist_status_in(&txn, &order_domain.id, status).await?;

        txn.commit().await?;

        info!(
            "Refund {} settled as {} (order {} -> {})",
            settled.id,
            new_status.as_ref(),
            order_domain.id,
            status.as_ref()
        );
        Ok(Some(settled))
    }
}
