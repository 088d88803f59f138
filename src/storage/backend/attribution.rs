//! Attribution click writes
//!
//! The click row and the affiliate click counter move in one
//! transaction: the counter feeds conversion-rate reporting and must
//! not drift from the click log.

use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{ColumnTrait, EntityTrait, ExprTrait, QueryFilter, TransactionTrait};
use tracing::debug;

use super::SeaOrmStorage;
use super::converters::affiliate_model_to_domain;
use super::retry;
use crate::errors::{MonetaError, Result};
use crate::storage::models::Affiliate;
use migration::entities::{affiliate, affiliate_click};

/// 新点击的写入参数
#[derive(Debug, Clone)]
pub struct NewClick {
    pub affiliate_id: String,
    pub session_id: String,
    pub ip_hash: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
}

impl SeaOrmStorage {
    pub async fn find_affiliate_by_code(&self, code: &str) -> Result<Option<Affiliate>> {
        let db = &self.db;
        let model = retry::with_retry("find_affiliate_by_code", self.retry_config, || async {
            affiliate::Entity::find()
                .filter(affiliate::Column::Code.eq(code))
                .one(db)
                .await
        })
        .await?;

        model.map(affiliate_model_to_domain).transpose()
    }

    pub async fn get_affiliate(&self, affiliate_id: &str) -> Result<Option<Affiliate>> {
        let db = &self.db;
        let model = retry::with_retry("get_affiliate", self.retry_config, || async {
            affiliate::Entity::find_by_id(affiliate_id.to_string())
                .one(db)
                .await
        })
        .await?;

        model.map(affiliate_model_to_domain).transpose()
    }

    pub async fn insert_affiliate(&self, new_affiliate: &Affiliate) -> Result<()> {
        let active_model = super::converters::affiliate_to_active_model(new_affiliate);
        let db = &self.db;
        retry::with_retry("insert_affiliate", self.retry_config, || async {
            affiliate::Entity::insert(active_model.clone()).exec(db).await
        })
        .await
        .map_err(|e| {
            MonetaError::database_operation(format!(
                "插入联盟成员 '{}' 失败: {}",
                new_affiliate.code, e
            ))
        })?;
        Ok(())
    }

    /// 点击行插入 + 点击计数自增，同一事务提交
    pub async fn record_click(&self, click: &NewClick) -> Result<()> {
        let txn = self.db.begin().await?;

        affiliate_click::Entity::insert(affiliate_click::ActiveModel {
            affiliate_id: Set(click.affiliate_id.clone()),
            session_id: Set(click.session_id.clone()),
            ip_hash: Set(click.ip_hash.clone()),
            utm_source: Set(click.utm_source.clone()),
            utm_medium: Set(click.utm_medium.clone()),
            utm_campaign: Set(click.utm_campaign.clone()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        })
        .exec(&txn)
        .await?;

        affiliate::Entity::update_many()
            .col_expr(
                affiliate::Column::ClickCount,
                Expr::col(affiliate::Column::ClickCount).add(1),
            )
            .filter(affiliate::Column::Id.eq(click.affiliate_id.clone()))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        debug!(
            "Click recorded for affiliate {} (session {})",
            click.affiliate_id, click.session_id
        );
        Ok(())
    }

    /// 按 session 查询点击（归因窗口校验用）
    pub async fn find_click_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<crate::storage::models::AffiliateClick>> {
        let db = &self.db;
        let model = retry::with_retry("find_click_by_session", self.retry_config, || async {
            affiliate_click::Entity::find()
                .filter(affiliate_click::Column::SessionId.eq(session_id))
                .one(db)
                .await
        })
        .await?;

        Ok(model.map(super::converters::click_model_to_domain))
    }
}
