//! 返佣与批量支付表迁移
//!
//! 创建 affiliate_referrals / affiliate_payouts / payout_referrals 表：
//! - affiliate_referrals.order_id 唯一，保证每订单至多一条返佣
//! - affiliate_payouts (batch_id, affiliate_id) 唯一，作为批次幂等锚点
//! - payout_referrals 结构化记录一次支付覆盖了哪些返佣

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 affiliate_referrals 表
        manager
            .create_table(
                Table::create()
                    .table(AffiliateReferrals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateReferrals::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateReferrals::AffiliateId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateReferrals::OrderId)
                            .string_len(36)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateReferrals::OrderAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateReferrals::CommissionRate)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateReferrals::CommissionAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateReferrals::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(AffiliateReferrals::PayoutId).string_len(36).null())
                    .col(
                        ColumnDef::new(AffiliateReferrals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateReferrals::ApprovedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 批次选取：按 affiliate + status 扫描，创建复合索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_referrals_affiliate_status")
                    .table(AffiliateReferrals::Table)
                    .col(AffiliateReferrals::AffiliateId)
                    .col(AffiliateReferrals::Status)
                    .to_owned(),
            )
            .await?;

        // 创建 affiliate_payouts 表
        manager
            .create_table(
                Table::create()
                    .table(AffiliatePayouts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliatePayouts::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::AffiliateId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::BatchId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AffiliatePayouts::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(AffiliatePayouts::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::TransferRef)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::FailureReason)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::Initiator)
                            .string_len(100)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliatePayouts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // (batch_id, affiliate_id) 唯一索引：批次重跑的本地幂等锚点
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uniq_payouts_batch_affiliate")
                    .table(AffiliatePayouts::Table)
                    .col(AffiliatePayouts::BatchId)
                    .col(AffiliatePayouts::AffiliateId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 创建 payout_referrals 关联表
        manager
            .create_table(
                Table::create()
                    .table(PayoutReferrals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PayoutReferrals::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PayoutReferrals::PayoutId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PayoutReferrals::ReferralId)
                            .string_len(36)
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_payout_referrals_payout")
                    .table(PayoutReferrals::Table)
                    .col(PayoutReferrals::PayoutId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PayoutReferrals::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliatePayouts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliateReferrals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AffiliateReferrals {
    Table,
    Id,
    AffiliateId,
    OrderId,
    OrderAmount,
    CommissionRate,
    CommissionAmount,
    Status,
    PayoutId,
    CreatedAt,
    ApprovedAt,
}

#[derive(DeriveIden)]
enum AffiliatePayouts {
    Table,
    Id,
    AffiliateId,
    BatchId,
    Amount,
    Status,
    TransferRef,
    FailureReason,
    Initiator,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PayoutReferrals {
    Table,
    Id,
    PayoutId,
    ReferralId,
}
