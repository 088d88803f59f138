//! Referral writes and the affiliate balance counters
//!
//! The three counters (total_earnings, pending_balance, paid_balance)
//! are mutated in exactly four places: referral creation, approval,
//! payout success (see payouts.rs) and reversal. Every mutation is
//! gated on a conditional status UPDATE whose affected-row count
//! decides whether the counter moves, so a raced duplicate transition
//! can never move a counter twice.

use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DbErr, EntityTrait, ExprTrait, QueryFilter, QueryOrder,
    TransactionTrait,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::{referral_model_to_domain, referral_to_active_model};
use super::retry;
use crate::errors::{MonetaError, Result};
use crate::storage::models::{AffiliateReferral, ReferralStatus};
use migration::entities::{affiliate, affiliate_referral};

/// 幂等创建的结果
#[derive(Debug, Clone)]
pub enum ReferralCreateOutcome {
    /// 新建成功，计数器已增加
    Created(AffiliateReferral),
    /// 该订单已有返佣行（webhook 重复投递），未做任何改动
    AlreadyExists(AffiliateReferral),
}

impl SeaOrmStorage {
    pub async fn find_referral_by_order(&self, order_id: &str) -> Result<Option<AffiliateReferral>> {
        let db = &self.db;
        let model = retry::with_retry("find_referral_by_order", self.retry_config, || async {
            affiliate_referral::Entity::find()
                .filter(affiliate_referral::Column::OrderId.eq(order_id))
                .one(db)
                .await
        })
        .await?;

        model.map(referral_model_to_domain).transpose()
    }

    /// 幂等创建返佣行，order_id 唯一索引兜底
    ///
    /// 创建成功时在同一事务内增加 total_earnings 和 pending_balance。
    /// 唯一索引冲突（并发重复投递）不视为错误，返回已存在的行。
    pub async fn create_referral_idempotent(
        &self,
        referral: &AffiliateReferral,
    ) -> Result<ReferralCreateOutcome> {
        use sea_orm::sea_query::OnConflict;

        let txn = self.db.begin().await?;

        let insert_result = affiliate_referral::Entity::insert(referral_to_active_model(referral))
            .on_conflict(
                OnConflict::column(affiliate_referral::Column::OrderId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&txn)
            .await;

        match insert_result {
            Ok(_) => {
                affiliate::Entity::update_many()
                    .col_expr(
                        affiliate::Column::TotalEarnings,
                        Expr::col(affiliate::Column::TotalEarnings)
                            .add(referral.commission_amount),
                    )
                    .col_expr(
                        affiliate::Column::PendingBalance,
                        Expr::col(affiliate::Column::PendingBalance)
                            .add(referral.commission_amount),
                    )
                    .filter(affiliate::Column::Id.eq(referral.affiliate_id.clone()))
                    .exec(&txn)
                    .await?;

                txn.commit().await?;
                info!(
                    "Referral {} created for order {} (commission {})",
                    referral.id, referral.order_id, referral.commission_amount
                );
                Ok(ReferralCreateOutcome::Created(referral.clone()))
            }
            Err(DbErr::RecordNotInserted) => {
                txn.rollback().await?;
                debug!(
                    "Referral for order {} already exists, duplicate conversion ignored",
                    referral.order_id
                );
                let existing = self
                    .find_referral_by_order(&referral.order_id)
                    .await?
                    .ok_or_else(|| {
                        MonetaError::database_operation(format!(
                            "订单 {} 的返佣行冲突后查询不到，索引状态异常",
                            referral.order_id
                        ))
                    })?;
                Ok(ReferralCreateOutcome::AlreadyExists(existing))
            }
            Err(e) => {
                txn.rollback().await?;
                Err(e.into())
            }
        }
    }

    /// pending → approved，批准只是重新归类：pending_balance 下降，
    /// total_earnings 不动
    pub async fn approve_referral(&self, referral_id: &str) -> Result<bool> {
        let now = chrono::Utc::now();
        let txn = self.db.begin().await?;

        let Some(model) = affiliate_referral::Entity::find_by_id(referral_id.to_string())
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(false);
        };
        let commission = model.commission_amount;
        let affiliate_id = model.affiliate_id.clone();

        let update_result = affiliate_referral::Entity::update_many()
            .col_expr(
                affiliate_referral::Column::Status,
                Expr::value(ReferralStatus::Approved.as_ref()),
            )
            .col_expr(affiliate_referral::Column::ApprovedAt, Expr::value(now))
            .filter(affiliate_referral::Column::Id.eq(referral_id))
            .filter(affiliate_referral::Column::Status.eq(ReferralStatus::Pending.as_ref()))
            .exec(&txn)
            .await?;

        if update_result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        affiliate::Entity::update_many()
            .col_expr(
                affiliate::Column::PendingBalance,
                Expr::col(affiliate::Column::PendingBalance).sub(commission),
            )
            .filter(affiliate::Column::Id.eq(affiliate_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    /// 批准所有超过审批窗口的 pending 返佣，返回批准数量
    pub async fn approve_due_referrals(
        &self,
        created_before: chrono::DateTime<chrono::Utc>,
    ) -> Result<usize> {
        let due = affiliate_referral::Entity::find()
            .filter(affiliate_referral::Column::Status.eq(ReferralStatus::Pending.as_ref()))
            .filter(affiliate_referral::Column::CreatedAt.lte(created_before))
            .all(&self.db)
            .await?;

        let mut approved = 0;
        for model in due {
            // 每行独立事务，单行失败不拖垮整批
            if self.approve_referral(&model.id).await? {
                approved += 1;
            }
        }
        Ok(approved)
    }

    /// 订单被退款时冲销返佣
    ///
    /// pending|approved → reversed；total_earnings 回退佣金，pending
    /// 状态下 pending_balance 一并回退。paid/reversed 行不动。
    pub async fn reverse_referral_for_order(&self, order_id: &str) -> Result<bool> {
        let txn = self.db.begin().await?;

        let Some(model) = affiliate_referral::Entity::find()
            .filter(affiliate_referral::Column::OrderId.eq(order_id))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(false);
        };

        let was_pending = model.status == ReferralStatus::Pending.as_ref();
        let commission = model.commission_amount;
        let affiliate_id = model.affiliate_id.clone();
        let referral_id = model.id.clone();

        let update_result = affiliate_referral::Entity::update_many()
            .col_expr(
                affiliate_referral::Column::Status,
                Expr::value(ReferralStatus::Reversed.as_ref()),
            )
            .filter(affiliate_referral::Column::Id.eq(referral_id.clone()))
            .filter(
                Condition::any()
                    .add(
                        affiliate_referral::Column::Status
                            .eq(ReferralStatus::Pending.as_ref()),
                    )
                    .add(
                        affiliate_referral::Column::Status
                            .eq(ReferralStatus::Approved.as_ref()),
                    ),
            )
            .exec(&txn)
            .await?;

        if update_result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(false);
        }

        let mut counter_update = affiliate::Entity::update_many().col_expr(
            affiliate::Column::TotalEarnings,
            Expr::col(affiliate::Column::TotalEarnings).sub(commission),
        );
        if was_pending {
            counter_update = counter_update.col_expr(
                affiliate::Column::PendingBalance,
                Expr::col(affiliate::Column::PendingBalance).sub(commission),
            );
        }
        counter_update
            .filter(affiliate::Column::Id.eq(affiliate_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!("Referral {} reversed (order {} refunded)", referral_id, order_id);
        Ok(true)
    }

    /// 某联盟成员已批准未支付的返佣，按创建时间升序（批次最旧优先）
    ///
    /// payout_id 非空的行已被某次进行中的支付锁定，不再入选。
    pub async fn approved_unpaid_referrals(
        &self,
        affiliate_id: &str,
    ) -> Result<Vec<AffiliateReferral>> {
        let db = &self.db;
        let affiliate_id = affiliate_id.to_string();
        let models = retry::with_retry("approved_unpaid_referrals", self.retry_config, || async {
            affiliate_referral::Entity::find()
                .filter(affiliate_referral::Column::AffiliateId.eq(affiliate_id.clone()))
                .filter(affiliate_referral::Column::Status.eq(ReferralStatus::Approved.as_ref()))
                .filter(affiliate_referral::Column::PayoutId.is_null())
                .order_by_asc(affiliate_referral::Column::CreatedAt)
                .order_by_asc(affiliate_referral::Column::Id)
                .all(db)
                .await
        })
        .await?;

        models.into_iter().map(referral_model_to_domain).collect()
    }

    /// 仅测试与后台工具使用：直接改一条返佣的费率字段以外的内容不可行，
    /// 这里只支持按 id 读取
    pub async fn get_referral(&self, referral_id: &str) -> Result<Option<AffiliateReferral>> {
        let db = &self.db;
        let model = retry::with_retry("get_referral", self.retry_config, || async {
            affiliate_referral::Entity::find_by_id(referral_id.to_string())
                .one(db)
                .await
        })
        .await?;

        model.map(referral_model_to_domain).transpose()
    }

    /// 更新联盟成员佣金费率（历史返佣不受影响，合同一经写入不可变）
    pub async fn update_affiliate_rate(&self, affiliate_id: &str, rate: f64) -> Result<()> {
        affiliate::Entity::update_many()
            .col_expr(affiliate::Column::CommissionRate, Expr::value(rate))
            .filter(affiliate::Column::Id.eq(affiliate_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
