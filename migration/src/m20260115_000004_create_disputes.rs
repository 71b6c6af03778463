use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Disputes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Disputes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Disputes::TaskId).uuid().not_null())
                    .col(ColumnDef::new(Disputes::EscrowId).uuid().not_null())
                    .col(ColumnDef::new(Disputes::RaisedBy).uuid().not_null())
                    .col(ColumnDef::new(Disputes::Reason).text().not_null())
                    .col(ColumnDef::new(Disputes::Status).string().not_null())
                    .col(ColumnDef::new(Disputes::Outcome).string())
                    .col(ColumnDef::new(Disputes::DoerAmount).big_integer())
                    .col(ColumnDef::new(Disputes::PosterAmount).big_integer())
                    .col(ColumnDef::new(Disputes::ResolverId).uuid())
                    .col(ColumnDef::new(Disputes::ResolvedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Disputes::CreatedAt)
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
            .drop_table(Table::drop().table(Disputes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Disputes {
    Table,
    Id,
    TaskId,
    EscrowId,
    RaisedBy,
    Reason,
    Status,
    Outcome,
    DoerAmount,
    PosterAmount,
    ResolverId,
    ResolvedAt,
    CreatedAt,
}
