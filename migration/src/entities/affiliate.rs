use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "affiliates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub code: String,
    pub display_name: String,
    pub status: String,
    /// Percentage rate applied at referral creation time
    pub commission_rate: f64,
    /// Flat per-order commission; takes precedence over the rate when set
    pub commission_flat: Option<i64>,
    pub total_earnings: i64,
    pub pending_balance: i64,
    pub paid_balance: i64,
    pub click_count: i64,
    /// Connected external transfer account id
    pub payout_account: Option<String>,
    pub payouts_enabled: bool,
    pub min_payout_override: Option<i64>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
