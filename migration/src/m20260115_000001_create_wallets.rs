use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Per-user balance projection, mutated only through ledger writes
        manager
            .create_table(
                Table::create()
                    .table(WalletBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletBalances::UserId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(WalletBalances::Balance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WalletBalances::TotalEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WalletBalances::CompletedTasks)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(WalletBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(WalletBalances::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Append-only balance mutation log
        manager
            .create_table(
                Table::create()
                    .table(WalletEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletEvents::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletEvents::UserId).uuid().not_null())
                    .col(ColumnDef::new(WalletEvents::EventType).string().not_null())
                    .col(ColumnDef::new(WalletEvents::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(WalletEvents::BalanceBefore)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(WalletEvents::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(WalletEvents::TaskId).uuid())
                    .col(ColumnDef::new(WalletEvents::EscrowId).uuid())
                    .col(
                        ColumnDef::new(WalletEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WalletEvents::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(WalletBalances::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum WalletBalances {
    Table,
    UserId,
    Balance,
    TotalEarned,
    CompletedTasks,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum WalletEvents {
    Table,
    Id,
    UserId,
    EventType,
    Amount,
    BalanceBefore,
    BalanceAfter,
    TaskId,
    EscrowId,
    CreatedAt,
}
