use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "affiliate_invites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub invite_code: String,
    /// Locks redemption to this email when set (case-insensitive match)
    pub target_email: Option<String>,
    pub target_phone: Option<String>,
    /// None means unlimited uses
    pub max_uses: Option<i32>,
    /// Monotonically increasing, never exceeds max_uses
    pub times_used: i32,
    pub expires_at: Option<DateTimeUtc>,
    /// Last redeemer, informational only
    pub used_by_affiliate_id: Option<String>,
    pub used_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
