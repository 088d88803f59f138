//! 订单与退款核心表迁移
//!
//! 创建 orders / refunds / audit_logs / webhook_events 表：
//! - orders: 订单主表，payment_status 为派生值的持久化副本
//! - refunds: 退款记录，金额使用最小货币单位整数
//! - audit_logs: 退款编排器写入的审计日志
//! - webhook_events: 供应商事件去重集合

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 orders 表
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Orders::PaymentStatus)
                            .string_len(20)
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(ColumnDef::new(Orders::TotalAmount).big_integer().not_null())
                    .col(ColumnDef::new(Orders::Currency).string_len(3).not_null())
                    .col(ColumnDef::new(Orders::PaymentRef).string_len(255).null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 创建 refunds 表
        manager
            .create_table(
                Table::create()
                    .table(Refunds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Refunds::Id)
                            .string_len(36)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Refunds::OrderId).string_len(36).not_null())
                    .col(ColumnDef::new(Refunds::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Refunds::Status).string_len(20).not_null())
                    .col(ColumnDef::new(Refunds::Source).string_len(20).not_null())
                    .col(ColumnDef::new(Refunds::ProviderRef).string_len(255).null())
                    .col(ColumnDef::new(Refunds::ReasonCode).string_len(40).null())
                    .col(
                        ColumnDef::new(Refunds::RawProviderStatus)
                            .string_len(40)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Refunds::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 按订单查询退款集合
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_refunds_order_id")
                    .table(Refunds::Table)
                    .col(Refunds::OrderId)
                    .to_owned(),
            )
            .await?;

        // webhook 结算回调按 provider_ref 定位退款行
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_refunds_provider_ref")
                    .table(Refunds::Table)
                    .col(Refunds::ProviderRef)
                    .to_owned(),
            )
            .await?;

        // 创建 audit_logs 表
        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLogs::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLogs::Actor).string_len(100).not_null())
                    .col(ColumnDef::new(AuditLogs::Action).string_len(60).not_null())
                    .col(
                        ColumnDef::new(AuditLogs::SubjectId)
                            .string_len(36)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AuditLogs::Detail).text().null())
                    .col(
                        ColumnDef::new(AuditLogs::CreatedAt)
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
                    .name("idx_audit_logs_subject")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::SubjectId)
                    .to_owned(),
            )
            .await?;

        // 创建 webhook_events 表（事件 id 即主键，重复投递插入冲突即丢弃）
        manager
            .create_table(
                Table::create()
                    .table(WebhookEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WebhookEvents::EventId)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WebhookEvents::ReceivedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WebhookEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Refunds::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Orders {
    Table,
    Id,
    Status,
    PaymentStatus,
    TotalAmount,
    Currency,
    PaymentRef,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Refunds {
    Table,
    Id,
    OrderId,
    Amount,
    Status,
    Source,
    ProviderRef,
    ReasonCode,
    RawProviderStatus,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    Actor,
    Action,
    SubjectId,
    Detail,
    CreatedAt,
}

#[derive(DeriveIden)]
enum WebhookEvents {
    Table,
    EventId,
    ReceivedAt,
}
