//! 联盟主体表迁移
//!
//! 创建 affiliates / affiliate_clicks / affiliate_invites / invite_usages 表。
//! affiliates 三个余额计数器恒满足 total_earnings >= pending_balance + paid_balance，
//! 已批准未支付余额始终派生计算，不冗余存储。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 affiliates 表
        manager
            .create_table(
                Table::create()
                    .table(Affiliates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Affiliates::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::Code)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::DisplayName)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::Status)
                            .string_len(20)
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(Affiliates::CommissionRate).double().not_null())
                    .col(ColumnDef::new(Affiliates::CommissionFlat).big_integer().null())
                    .col(
                        ColumnDef::new(Affiliates::TotalEarnings)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::PendingBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::PaidBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Affiliates::PayoutAccount)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::PayoutsEnabled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Affiliates::MinPayoutOverride)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Affiliates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 affiliate_clicks 表（一次写入，永不更新）
        manager
            .create_table(
                Table::create()
                    .table(AffiliateClicks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateClicks::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClicks::AffiliateId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClicks::SessionId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClicks::IpHash)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(AffiliateClicks::UtmSource).string_len(100).null())
                    .col(ColumnDef::new(AffiliateClicks::UtmMedium).string_len(100).null())
                    .col(
                        ColumnDef::new(AffiliateClicks::UtmCampaign)
                            .string_len(100)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateClicks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_affiliate_clicks_affiliate")
                    .table(AffiliateClicks::Table)
                    .col(AffiliateClicks::AffiliateId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_affiliate_clicks_session")
                    .table(AffiliateClicks::Table)
                    .col(AffiliateClicks::SessionId)
                    .to_owned(),
            )
            .await?;

        // 创建 affiliate_invites 表
        manager
            .create_table(
                Table::create()
                    .table(AffiliateInvites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AffiliateInvites::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateInvites::InviteCode)
                            .string_len(64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(AffiliateInvites::TargetEmail)
                            .string_len(255)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateInvites::TargetPhone)
                            .string_len(40)
                            .null(),
                    )
                    .col(ColumnDef::new(AffiliateInvites::MaxUses).integer().null())
                    .col(
                        ColumnDef::new(AffiliateInvites::TimesUsed)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(AffiliateInvites::ExpiresAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateInvites::UsedByAffiliateId)
                            .string_len(36)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateInvites::UsedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AffiliateInvites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 invite_usages 表（兑换审计行，与计数器互相独立）
        manager
            .create_table(
                Table::create()
                    .table(InviteUsages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InviteUsages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InviteUsages::InviteId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InviteUsages::AffiliateId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(InviteUsages::Metadata).text().null())
                    .col(
                        ColumnDef::new(InviteUsages::UsedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_invite_usages_invite")
                    .table(InviteUsages::Table)
                    .col(InviteUsages::InviteId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InviteUsages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliateInvites::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AffiliateClicks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Affiliates::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Affiliates {
    Table,
    Id,
    Code,
    DisplayName,
    Status,
    CommissionRate,
    CommissionFlat,
    TotalEarnings,
    PendingBalance,
    PaidBalance,
    ClickCount,
    PayoutAccount,
    PayoutsEnabled,
    MinPayoutOverride,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AffiliateClicks {
    Table,
    Id,
    AffiliateId,
    SessionId,
    IpHash,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AffiliateInvites {
    Table,
    Id,
    InviteCode,
    TargetEmail,
    TargetPhone,
    MaxUses,
    TimesUsed,
    ExpiresAt,
    UsedByAffiliateId,
    UsedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InviteUsages {
    Table,
    Id,
    InviteId,
    AffiliateId,
    Metadata,
    UsedAt,
}
