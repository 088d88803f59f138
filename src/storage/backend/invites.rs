//! Invite redemption, storage half
//!
//! The redemption is a single conditional UPDATE that increments
//! `times_used` only while `times_used < max_uses` (or max_uses is
//! unset) and the invite has not expired. The affected-row count of
//! that statement is the only success signal; there is no
//! read-check-then-write pair anywhere on this path. The usage-history
//! row is appended in the same transaction.

use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, ExprTrait, QueryFilter, TransactionTrait,
};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::{invite_model_to_domain, invite_to_active_model};
use super::retry;
use crate::errors::{MonetaError, Result};
use crate::storage::models::AffiliateInvite;
use migration::entities::{affiliate_invite, invite_usage};

/// 条件更新的行级结果
#[derive(Debug, Clone)]
pub enum RedeemRowOutcome {
    /// 恰好一行被更新，返回更新后的邀请
    Redeemed(AffiliateInvite),
    /// 零行被更新：已耗尽、已过期或 id 不存在，由服务层分类
    NotUpdated,
}

impl SeaOrmStorage {
    pub async fn get_invite(&self, invite_id: &str) -> Result<Option<AffiliateInvite>> {
        let db = &self.db;
        let model = retry::with_retry("get_invite", self.retry_config, || async {
            affiliate_invite::Entity::find_by_id(invite_id.to_string())
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(invite_model_to_domain))
    }

    pub async fn find_invite_by_code(&self, code: &str) -> Result<Option<AffiliateInvite>> {
        let db = &self.db;
        let model = retry::with_retry("find_invite_by_code", self.retry_config, || async {
            affiliate_invite::Entity::find()
                .filter(affiliate_invite::Column::InviteCode.eq(code))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(invite_model_to_domain))
    }

    pub async fn insert_invite(&self, invite: &AffiliateInvite) -> Result<()> {
        let active_model = invite_to_active_model(invite);
        let db = &self.db;
        retry::with_retry("insert_invite", self.retry_config, || async {
            affiliate_invite::Entity::insert(active_model.clone())
                .exec(db)
                .await
        })
        .await
        .map_err(|e| {
            MonetaError::database_operation(format!(
                "插入邀请码 '{}' 失败: {}",
                invite.invite_code, e
            ))
        })?;
        Ok(())
    }

    /// 原子兑换：条件自增 + 审计行，同一事务
    pub async fn redeem_invite_row(
        &self,
        invite_id: &str,
        affiliate_id: &str,
        metadata: Option<&str>,
    ) -> Result<RedeemRowOutcome> {
        let now = chrono::Utc::now();
        let txn = self.db.begin().await?;

        let update_result = affiliate_invite::Entity::update_many()
            .col_expr(
                affiliate_invite::Column::TimesUsed,
                Expr::col(affiliate_invite::Column::TimesUsed).add(1),
            )
            .col_expr(
                affiliate_invite::Column::UsedByAffiliateId,
                Expr::value(affiliate_id),
            )
            .col_expr(affiliate_invite::Column::UsedAt, Expr::value(now))
            .filter(affiliate_invite::Column::Id.eq(invite_id))
            // max_uses 未设置视为不限量
            .filter(
                Condition::any()
                    .add(affiliate_invite::Column::MaxUses.is_null())
                    .add(
                        Expr::col(affiliate_invite::Column::TimesUsed)
                            .lt(Expr::col(affiliate_invite::Column::MaxUses)),
                    ),
            )
            // expires_at 未设置或仍在未来
            .filter(
                Condition::any()
                    .add(affiliate_invite::Column::ExpiresAt.is_null())
                    .add(affiliate_invite::Column::ExpiresAt.gt(now)),
            )
            .exec(&txn)
            .await?;

        if update_result.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(RedeemRowOutcome::NotUpdated);
        }

        invite_usage::Entity::insert(invite_usage::ActiveModel {
            invite_id: Set(invite_id.to_string()),
            affiliate_id: Set(affiliate_id.to_string()),
            metadata: Set(metadata.map(String::from)),
            used_at: Set(now),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        let updated = affiliate_invite::Entity::find_by_id(invite_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| {
                MonetaError::database_operation(format!(
                    "邀请 {} 在更新后消失，事务状态异常",
                    invite_id
                ))
            })?;

        txn.commit().await?;

        debug!(
            "Invite {} redeemed by affiliate {} (times_used now {})",
            invite_id, affiliate_id, updated.times_used
        );
        Ok(RedeemRowOutcome::Redeemed(invite_model_to_domain(updated)))
    }

    /// 邀请的兑换历史行数（审计用）
    pub async fn count_invite_usages(&self, invite_id: &str) -> Result<u64> {
        use sea_orm::PaginatorTrait;

        let db = &self.db;
        let count = retry::with_retry("count_invite_usages", self.retry_config, || async {
            invite_usage::Entity::find()
                .filter(invite_usage::Column::InviteId.eq(invite_id))
                .count(db)
                .await
        })
        .await?;
        Ok(count)
    }
}
