//! Side table recording which referrals a payout covers

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "payout_referrals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub payout_id: String,
    pub referral_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
