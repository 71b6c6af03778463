use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The sweep scans submitted tasks by review deadline
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_status_review_deadline")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .col(Tasks::ReviewDeadline)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_poster")
                    .table(Tasks::Table)
                    .col(Tasks::PosterId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_doer")
                    .table(Tasks::Table)
                    .col(Tasks::DoerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_events_user")
                    .table(WalletEvents::Table)
                    .col(WalletEvents::UserId)
                    .col(WalletEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_disputes_task")
                    .table(Disputes::Table)
                    .col(Disputes::TaskId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_disputes_task").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_wallet_events_user").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_tasks_doer").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_tasks_poster").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_tasks_status_review_deadline")
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    PosterId,
    DoerId,
    Status,
    ReviewDeadline,
}

#[derive(DeriveIden)]
enum WalletEvents {
    Table,
    UserId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Disputes {
    Table,
    TaskId,
}
