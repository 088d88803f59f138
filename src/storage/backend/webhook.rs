//! Webhook delivery deduplication
//!
//! Providers redeliver events; each event id is claimed exactly once
//! through a primary-key insert with on-conflict-do-nothing. Only the
//! claimer processes the payload.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::ActiveValue::Set;
use sea_orm::{DbErr, EntityTrait};
use tracing::debug;

use super::SeaOrmStorage;
use crate::errors::Result;
use migration::entities::webhook_event;

impl SeaOrmStorage {
    /// 首次见到该事件返回 true，重复投递返回 false
    pub async fn claim_webhook_event(&self, event_id: &str) -> Result<bool> {
        let result = webhook_event::Entity::insert(webhook_event::ActiveModel {
            event_id: Set(event_id.to_string()),
            received_at: Set(Utc::now()),
        })
        .on_conflict(
            OnConflict::column(webhook_event::Column::EventId)
                .do_nothing()
                .to_owned(),
        )
        .exec(&self.db)
        .await;

        match result {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotInserted) => {
                debug!("Webhook event {} already processed, skipping", event_id);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}
