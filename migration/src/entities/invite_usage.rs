//! Immutable invite usage history, written in the same transaction as the
//! conditional counter increment

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "invite_usages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub invite_id: String,
    pub affiliate_id: String,
    pub metadata: Option<String>,
    pub used_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
