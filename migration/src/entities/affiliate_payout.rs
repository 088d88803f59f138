use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliate_payouts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub affiliate_id: String,
    /// One row per (batch_id, affiliate_id), enforced by unique index
    pub batch_id: String,
    pub amount: i64,
    pub status: String,
    pub transfer_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub initiator: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
