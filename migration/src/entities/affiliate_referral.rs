use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "affiliate_referrals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub affiliate_id: String,
    /// Unique per order, duplicate conversions are idempotent no-ops
    #[sea_orm(unique)]
    pub order_id: String,
    pub order_amount: i64,
    /// Rate at creation time, never retroactively recalculated
    pub commission_rate: f64,
    pub commission_amount: i64,
    pub status: String,
    pub payout_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub approved_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
