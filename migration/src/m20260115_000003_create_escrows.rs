use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Escrows::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Escrows::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Escrows::TaskId)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Escrows::PosterId).uuid().not_null())
                    .col(ColumnDef::new(Escrows::DoerId).uuid())
                    .col(
                        ColumnDef::new(Escrows::GrossAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Escrows::PlatformFee).big_integer())
                    .col(ColumnDef::new(Escrows::NetPayout).big_integer())
                    .col(ColumnDef::new(Escrows::AppliedFeeBps).integer())
                    .col(ColumnDef::new(Escrows::TaskTierFeeBps).integer())
                    .col(ColumnDef::new(Escrows::ValueTierFeeBps).integer())
                    .col(ColumnDef::new(Escrows::Status).string().not_null())
                    .col(ColumnDef::new(Escrows::AutoReleaseAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Escrows::ReleasedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Escrows::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Escrows::UpdatedAt)
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
            .drop_table(Table::drop().table(Escrows::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Escrows {
    Table,
    Id,
    TaskId,
    PosterId,
    DoerId,
    GrossAmount,
    PlatformFee,
    NetPayout,
    AppliedFeeBps,
    TaskTierFeeBps,
    ValueTierFeeBps,
    Status,
    AutoReleaseAt,
    ReleasedAt,
    CreatedAt,
    UpdatedAt,
}
