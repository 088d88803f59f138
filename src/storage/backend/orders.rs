//! Order and refund-set queries
//!
//! 派生支付状态的持久化副本由 refunds.rs 在退款写入/结算事务内更新，
//! 这里只提供读取与插入。

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use super::SeaOrmStorage;
use super::converters::{
    order_model_to_domain, order_to_active_model, refund_model_to_domain,
};
use super::retry;
use crate::errors::{MonetaError, Result};
use crate::storage::models::{Order, Refund};
use migration::entities::{order, refund};

impl SeaOrmStorage {
    pub async fn get_order(&self, order_id: &str) -> Result<Option<Order>> {
        let db = &self.db;
        let model = retry::with_retry("get_order", self.retry_config, || async {
            order::Entity::find_by_id(order_id.to_string()).one(db).await
        })
        .await?;

        model.map(order_model_to_domain).transpose()
    }

    pub async fn insert_order(&self, new_order: &Order) -> Result<()> {
        let active_model = order_to_active_model(new_order);
        let db = &self.db;
        retry::with_retry("insert_order", self.retry_config, || async {
            order::Entity::insert(active_model.clone()).exec(db).await
        })
        .await
        .map_err(|e| {
            MonetaError::database_operation(format!("插入订单 '{}' 失败: {}", new_order.id, e))
        })?;
        Ok(())
    }

    /// 加载一个订单的全部退款行，按 (created_at, id) 升序保证确定性
    pub async fn load_refunds(&self, order_id: &str) -> Result<Vec<Refund>> {
        let db = &self.db;
        let models = retry::with_retry("load_refunds", self.retry_config, || async {
            refund::Entity::find()
                .filter(refund::Column::OrderId.eq(order_id))
                .order_by_asc(refund::Column::CreatedAt)
                .order_by_asc(refund::Column::Id)
                .all(db)
                .await
        })
        .await?;

        models.into_iter().map(refund_model_to_domain).collect()
    }
}
