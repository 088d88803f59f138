use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "refunds")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_id: String,
    pub amount: i64,
    pub status: String,
    pub source: String,
    /// Provider-side refund id (None for manual refunds)
    pub provider_ref: Option<String>,
    pub reason_code: Option<String>,
    /// Untranslated provider status, kept for audit
    pub raw_provider_status: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
