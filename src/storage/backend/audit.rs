use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::EntityTrait;

use super::SeaOrmStorage;
use crate::errors::Result;
use migration::entities::audit_log;

impl SeaOrmStorage {
    /// 审计流水：资金动作的操作者、动作与原始返回值
    pub async fn insert_audit_log(
        &self,
        actor: &str,
        action: &str,
        subject_id: &str,
        detail: Option<serde_json::Value>,
    ) -> Result<()> {
        audit_log::Entity::insert(audit_log::ActiveModel {
            actor: Set(actor.to_string()),
            action: Set(action.to_string()),
            subject_id: Set(subject_id.to_string()),
            detail: Set(detail.map(|v| v.to_string())),
            created_at: Set(Utc::now()),
            ..Default::default()
        })
        .exec(&self.db)
        .await?;
        Ok(())
    }
}
