//! Payout rows and the paid-state transition
//!
//! One AffiliatePayout row exists per (batch_id, affiliate_id), backed
//! by a unique index; the row is checked before any transfer call so a
//! re-run batch never re-issues a transfer. Inserting the row also
//! claims its referrals (conditional `payout_id` backfill gated on
//! rows_affected), so two overlapping runs with different batch ids
//! can never both carry the same referrals to the provider. Referrals
//! only become `paid` after the transfer itself reported success,
//! inside the same transaction that moves the affiliate's paid_balance.

use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, ExprTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{debug, info, warn};

use super::SeaOrmStorage;
use super::converters::{
    affiliate_model_to_domain, payout_model_to_domain, payout_to_active_model,
    referral_model_to_domain,
};
use super::retry;
use crate::errors::{MonetaError, Result};
use crate::storage::models::{Affiliate, AffiliatePayout, AffiliateReferral, PayoutStatus, ReferralStatus};
use migration::entities::{affiliate, affiliate_payout, affiliate_referral, payout_referral};

impl SeaOrmStorage {
    /// 批次幂等锚点：本地 payout 行存在即不再发起转账
    pub async fn find_payout_by_batch_affiliate(
        &self,
        batch_id: &str,
        affiliate_id: &str,
    ) -> Result<Option<AffiliatePayout>> {
        let db = &self.db;
        let batch_id = batch_id.to_string();
        let affiliate_id = affiliate_id.to_string();
        let model = retry::with_retry(
            "find_payout_by_batch_affiliate",
            self.retry_config,
            || async {
                affiliate_payout::Entity::find()
                    .filter(affiliate_payout::Column::BatchId.eq(batch_id.clone()))
                    .filter(affiliate_payout::Column::AffiliateId.eq(affiliate_id.clone()))
                    .one(db)
                    .await
            },
        )
        .await?;

        model.map(payout_model_to_domain).transpose()
    }

    /// 落 payout 行并在同一事务内锁定其覆盖的返佣
    ///
    /// 条件回填 payout_id（仅 approved 且未被其他支付锁定的行），
    /// rows_affected 不等于返佣数即整体回滚并返回 false：这些返佣
    /// 已被并发的另一次支付拿走，调用方绝不能再发起转账。
    pub async fn insert_payout_claiming(
        &self,
        payout: &AffiliatePayout,
        referrals: &[AffiliateReferral],
    ) -> Result<bool> {
        let txn = self.db.begin().await?;

        affiliate_payout::Entity::insert(payout_to_active_model(payout))
            .exec(&txn)
            .await
            .map_err(|e| {
                MonetaError::database_operation(format!(
                    "插入 payout 行失败 (batch: {}, affiliate: {}): {}",
                    payout.batch_id, payout.affiliate_id, e
                ))
            })?;

        let ids: Vec<String> = referrals.iter().map(|r| r.id.clone()).collect();
        let claimed = affiliate_referral::Entity::update_many()
            .col_expr(
                affiliate_referral::Column::PayoutId,
                Expr::value(payout.id.clone()),
            )
            .filter(affiliate_referral::Column::Id.is_in(ids.clone()))
            .filter(
                affiliate_referral::Column::Status.eq(ReferralStatus::Approved.as_ref()),
            )
            .filter(affiliate_referral::Column::PayoutId.is_null())
            .exec(&txn)
            .await?;

        if claimed.rows_affected != ids.len() as u64 {
            txn.rollback().await?;
            debug!(
                "Payout claim for affiliate {} got {}/{} referrals, another payout holds them",
                payout.affiliate_id,
                claimed.rows_affected,
                ids.len()
            );
            return Ok(false);
        }

        txn.commit().await?;
        Ok(true)
    }

    /// 转账成功后的原子收尾
    ///
    /// 同一事务内：payout 行 → paid；覆盖的返佣行 → paid 并回填
    /// payout_id；payout_referrals 关联行落库；paid_balance 增加。
    /// 仍处 pending 的返佣（管理员强制支付场景）额外回退 pending_balance。
    pub async fn mark_payout_paid(
        &self,
        payout_id: &str,
        transfer_ref: &str,
        referrals: &[AffiliateReferral],
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        let Some(payout_model) = affiliate_payout::Entity::find_by_id(payout_id.to_string())
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Err(MonetaError::not_found(format!("payout {} 不存在", payout_id)));
        };

        affiliate_payout::Entity::update_many()
            .col_expr(
                affiliate_payout::Column::Status,
                Expr::value(PayoutStatus::Paid.as_ref()),
            )
            .col_expr(
                affiliate_payout::Column::TransferRef,
                Expr::value(transfer_ref),
            )
            .filter(affiliate_payout::Column::Id.eq(payout_id))
            .exec(&txn)
            .await?;

        // 以事务内的当前状态为准，选取快照不作数：选取与结算之间
        // 被冲销的返佣行必须保持 reversed，不得翻回 paid
        let ids: Vec<String> = referrals.iter().map(|r| r.id.clone()).collect();
        let current_rows = affiliate_referral::Entity::find()
            .filter(affiliate_referral::Column::Id.is_in(ids))
            .all(&txn)
            .await?;

        let mut still_pending_total: i64 = 0;
        for row in &current_rows {
            let flipped = affiliate_referral::Entity::update_many()
                .col_expr(
                    affiliate_referral::Column::Status,
                    Expr::value(ReferralStatus::Paid.as_ref()),
                )
                .col_expr(
                    affiliate_referral::Column::PayoutId,
                    Expr::value(payout_id),
                )
                .filter(affiliate_referral::Column::Id.eq(row.id.clone()))
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

            if flipped.rows_affected == 0 {
                warn!(
                    "Referral {} left payout {} uncovered (status '{}' at settlement), not flipped",
                    row.id, payout_id, row.status
                );
                continue;
            }

            if row.status == ReferralStatus::Pending.as_ref() {
                still_pending_total += row.commission_amount;
            }

            payout_referral::Entity::insert(payout_referral::ActiveModel {
                payout_id: Set(payout_id.to_string()),
                referral_id: Set(row.id.clone()),
                ..Default::default()
            })
            .exec(&txn)
            .await?;
        }

        let mut counter_update = affiliate::Entity::update_many().col_expr(
            affiliate::Column::PaidBalance,
            Expr::col(affiliate::Column::PaidBalance).add(payout_model.amount),
        );
        if still_pending_total > 0 {
            counter_update = counter_update.col_expr(
                affiliate::Column::PendingBalance,
                Expr::col(affiliate::Column::PendingBalance).sub(still_pending_total),
            );
        }
        counter_update
            .filter(affiliate::Column::Id.eq(payout_model.affiliate_id.clone()))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        info!(
            "Payout {} paid ({} to affiliate {}, transfer {})",
            payout_id, payout_model.amount, payout_model.affiliate_id, transfer_ref
        );
        Ok(())
    }

    /// 转账失败/被拒：记录结果并释放锁定，返佣保持 approved 等待下一批
    pub async fn mark_payout_failed(
        &self,
        payout_id: &str,
        status: PayoutStatus,
        reason: &str,
    ) -> Result<()> {
        let txn = self.db.begin().await?;

        affiliate_payout::Entity::update_many()
            .col_expr(
                affiliate_payout::Column::Status,
                Expr::value(status.as_ref()),
            )
            .col_expr(
                affiliate_payout::Column::FailureReason,
                Expr::value(reason),
            )
            .filter(affiliate_payout::Column::Id.eq(payout_id))
            .exec(&txn)
            .await?;

        affiliate_referral::Entity::update_many()
            .col_expr(
                affiliate_referral::Column::PayoutId,
                Expr::value(Option::<String>::None),
            )
            .filter(affiliate_referral::Column::PayoutId.eq(payout_id))
            .filter(
                affiliate_referral::Column::Status.eq(ReferralStatus::Approved.as_ref()),
            )
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// 支付启用且已连接转账账户的联盟成员（资格初筛，余额在服务层判定）
    pub async fn payout_enabled_affiliates(&self) -> Result<Vec<Affiliate>> {
        let db = &self.db;
        let models = retry::with_retry("payout_enabled_affiliates", self.retry_config, || async {
            affiliate::Entity::find()
                .filter(affiliate::Column::PayoutsEnabled.eq(true))
                .filter(affiliate::Column::PayoutAccount.is_not_null())
                .all(db)
                .await
        })
        .await?;

        models.into_iter().map(affiliate_model_to_domain).collect()
    }

    /// 批次内全部 payout 行
    pub async fn payouts_by_batch(&self, batch_id: &str) -> Result<Vec<AffiliatePayout>> {
        let db = &self.db;
        let batch_id = batch_id.to_string();
        let models = retry::with_retry("payouts_by_batch", self.retry_config, || async {
            affiliate_payout::Entity::find()
                .filter(affiliate_payout::Column::BatchId.eq(batch_id.clone()))
                .order_by_asc(affiliate_payout::Column::CreatedAt)
                .all(db)
                .await
        })
        .await?;

        models.into_iter().map(payout_model_to_domain).collect()
    }

    /// 一次支付覆盖的返佣行（payout_referrals 关联表）
    pub async fn referrals_for_payout(&self, payout_id: &str) -> Result<Vec<AffiliateReferral>> {
        let links = payout_referral::Entity::find()
            .filter(payout_referral::Column::PayoutId.eq(payout_id))
            .all(&self.db)
            .await?;

        let ids: Vec<String> = links.into_iter().map(|l| l.referral_id).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = affiliate_referral::Entity::find()
            .filter(affiliate_referral::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;

        models.into_iter().map(referral_model_to_domain).collect()
    }
}
