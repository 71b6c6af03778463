use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Write-once idempotency records, unique per (key, caller, endpoint)
        manager
            .create_table(
                Table::create()
                    .table(IdempotencyKeys::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(IdempotencyKeys::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(IdempotencyKeys::Key).string().not_null())
                    .col(ColumnDef::new(IdempotencyKeys::CallerId).uuid().not_null())
                    .col(
                        ColumnDef::new(IdempotencyKeys::Endpoint)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IdempotencyKeys::RequestHash)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IdempotencyKeys::ResponseStatus)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IdempotencyKeys::ResponseBody)
                            .json()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(IdempotencyKeys::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_idempotency_scope")
                    .table(IdempotencyKeys::Table)
                    .col(IdempotencyKeys::Key)
                    .col(IdempotencyKeys::CallerId)
                    .col(IdempotencyKeys::Endpoint)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // One row per accepted request; counted by window, expired by purge
        manager
            .create_table(
                Table::create()
                    .table(RateLimitEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RateLimitEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RateLimitEntries::Identifier)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateLimitEntries::Operation)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RateLimitEntries::WindowStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rate_limit_window")
                    .table(RateLimitEntries::Table)
                    .col(RateLimitEntries::Identifier)
                    .col(RateLimitEntries::Operation)
                    .col(RateLimitEntries::WindowStart)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RateLimitEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(IdempotencyKeys::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum IdempotencyKeys {
    Table,
    Id,
    Key,
    CallerId,
    Endpoint,
    RequestHash,
    ResponseStatus,
    ResponseBody,
    CreatedAt,
}

#[derive(DeriveIden)]
enum RateLimitEntries {
    Table,
    Id,
    Identifier,
    Operation,
    WindowStart,
}
