// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::dispute::{Dispute, DisputeOutcome, ResolutionRecord};
use crate::domain::models::escrow::{EscrowStatus, EscrowTransaction, FeeBreakdown};
use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::models::wallet::{WalletEvent, WalletEventType};
use crate::domain::repositories::escrow_repository::{
    DisputeResolution, EscrowRepository, EscrowRepositoryError, SettlementOutcome,
};
use crate::infrastructure::database::entities::{
    dispute as dispute_entity, escrow as escrow_entity, task as task_entity,
    wallet_balance as balance_entity, wallet_event as event_entity,
};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 托管仓库实现
///
/// 状态机的结算端口。每个写方法在内部开启一个事务，
/// 条件更新以受影响行数决出竞态赢家；任务、托管、钱包
/// 三张表的变更要么全部提交，要么全部回滚。
#[derive(Clone)]
pub struct EscrowRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl EscrowRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 在事务内读出或初始化钱包行
    async fn balance_for_update(
        txn: &DatabaseTransaction,
        user_id: Uuid,
    ) -> Result<balance_entity::Model, DbErr> {
        if let Some(model) = balance_entity::Entity::find_by_id(user_id).one(txn).await? {
            return Ok(model);
        }

        let now = Utc::now().fixed_offset();
        let fresh = balance_entity::ActiveModel {
            user_id: Set(user_id),
            balance: Set(0),
            total_earned: Set(0),
            completed_tasks: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        fresh.insert(txn).await
    }

    /// 在事务内执行一次入账/出账并写流水
    ///
    /// `delta` 为有符号变动；`count_completion` 入账同时累加
    /// 执行者的完成任务数与累计收入。
    #[allow(clippy::too_many_arguments)]
    async fn apply_wallet_delta(
        txn: &DatabaseTransaction,
        user_id: Uuid,
        delta: i64,
        event_type: WalletEventType,
        task_id: Option<Uuid>,
        escrow_id: Option<Uuid>,
        count_completion: bool,
    ) -> Result<WalletEvent, DbErr> {
        let wallet = Self::balance_for_update(txn, user_id).await?;
        let balance_before = wallet.balance;
        let balance_after = balance_before + delta;

        let now = Utc::now().fixed_offset();
        let mut active: balance_entity::ActiveModel = wallet.into();
        active.balance = Set(balance_after);
        if count_completion {
            let earned = *active.total_earned.as_ref() + delta;
            let completed = *active.completed_tasks.as_ref() + 1;
            active.total_earned = Set(earned);
            active.completed_tasks = Set(completed);
        }
        active.updated_at = Set(now);
        active.update(txn).await?;

        let event = event_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            event_type: Set(event_type.to_string()),
            amount: Set(delta),
            balance_before: Set(balance_before),
            balance_after: Set(balance_after),
            task_id: Set(task_id),
            escrow_id: Set(escrow_id),
            created_at: Set(now),
        };
        let inserted = event.insert(txn).await?;

        Ok(inserted.into())
    }

    /// 条件推进任务状态，返回本次调用是否赢得更新
    async fn advance_task(
        txn: &DatabaseTransaction,
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
        now: DateTime<FixedOffset>,
    ) -> Result<bool, DbErr> {
        let mut update = task_entity::Entity::update_many()
            .col_expr(task_entity::Column::Status, Expr::value(to.to_string()))
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now));

        if matches!(to, TaskStatus::Completed | TaskStatus::Cancelled) {
            update = update.col_expr(task_entity::Column::CompletedAt, Expr::value(Some(now)));
        }

        let result = update
            .filter(task_entity::Column::Id.eq(task_id))
            .filter(task_entity::Column::Status.eq(from.to_string()))
            .exec(txn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// 条件结算托管（held → 终态），返回是否赢得更新
    async fn settle_escrow(
        txn: &DatabaseTransaction,
        task_id: Uuid,
        to: EscrowStatus,
        now: DateTime<FixedOffset>,
    ) -> Result<bool, DbErr> {
        let result = escrow_entity::Entity::update_many()
            .col_expr(escrow_entity::Column::Status, Expr::value(to.to_string()))
            .col_expr(escrow_entity::Column::ReleasedAt, Expr::value(Some(now)))
            .col_expr(
                escrow_entity::Column::AutoReleaseAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(escrow_entity::Column::UpdatedAt, Expr::value(now))
            .filter(escrow_entity::Column::TaskId.eq(task_id))
            .filter(escrow_entity::Column::Status.eq(EscrowStatus::Held.to_string()))
            .exec(txn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn load_escrow(
        txn: &DatabaseTransaction,
        task_id: Uuid,
    ) -> Result<escrow_entity::Model, DbErr> {
        escrow_entity::Entity::find()
            .filter(escrow_entity::Column::TaskId.eq(task_id))
            .one(txn)
            .await?
            .ok_or_else(|| DbErr::Custom(format!("escrow missing for task {}", task_id)))
    }
}

impl From<escrow_entity::Model> for EscrowTransaction {
    fn from(model: escrow_entity::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            poster_id: model.poster_id,
            doer_id: model.doer_id,
            gross_amount: model.gross_amount,
            platform_fee: model.platform_fee,
            net_payout: model.net_payout,
            applied_fee_bps: model.applied_fee_bps,
            task_tier_fee_bps: model.task_tier_fee_bps,
            value_tier_fee_bps: model.value_tier_fee_bps,
            status: model.status.parse().unwrap_or_default(),
            auto_release_at: model.auto_release_at,
            released_at: model.released_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&EscrowTransaction> for escrow_entity::ActiveModel {
    fn from(escrow: &EscrowTransaction) -> Self {
        Self {
            id: Set(escrow.id),
            task_id: Set(escrow.task_id),
            poster_id: Set(escrow.poster_id),
            doer_id: Set(escrow.doer_id),
            gross_amount: Set(escrow.gross_amount),
            platform_fee: Set(escrow.platform_fee),
            net_payout: Set(escrow.net_payout),
            applied_fee_bps: Set(escrow.applied_fee_bps),
            task_tier_fee_bps: Set(escrow.task_tier_fee_bps),
            value_tier_fee_bps: Set(escrow.value_tier_fee_bps),
            status: Set(escrow.status.to_string()),
            auto_release_at: Set(escrow.auto_release_at),
            released_at: Set(escrow.released_at),
            created_at: Set(escrow.created_at),
            updated_at: Set(escrow.updated_at),
        }
    }
}

#[async_trait]
impl EscrowRepository for EscrowRepositoryImpl {
    async fn find_by_id(
        &self,
        id: Uuid,
    ) -> Result<Option<EscrowTransaction>, EscrowRepositoryError> {
        let model = escrow_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_task_id(
        &self,
        task_id: Uuid,
    ) -> Result<Option<EscrowTransaction>, EscrowRepositoryError> {
        let model = escrow_entity::Entity::find()
            .filter(escrow_entity::Column::TaskId.eq(task_id))
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn fund(
        &self,
        task: &Task,
        escrow: &EscrowTransaction,
    ) -> Result<WalletEvent, EscrowRepositoryError> {
        let txn = self.db.begin().await?;

        let wallet = Self::balance_for_update(&txn, task.poster_id).await?;
        if wallet.balance < escrow.gross_amount {
            // 余额不足时不产生任何写入
            return Err(EscrowRepositoryError::InsufficientFunds {
                available: wallet.balance,
                required: escrow.gross_amount,
            });
        }

        let event = Self::apply_wallet_delta(
            &txn,
            task.poster_id,
            -escrow.gross_amount,
            WalletEventType::EscrowFund,
            Some(task.id),
            Some(escrow.id),
            false,
        )
        .await?;

        let task_model: task_entity::ActiveModel = task.into();
        task_model.insert(&txn).await?;

        let escrow_model: escrow_entity::ActiveModel = escrow.into();
        escrow_model.insert(&txn).await?;

        txn.commit().await?;
        Ok(event)
    }

    async fn accept(
        &self,
        task_id: Uuid,
        doer_id: Uuid,
        fee: &FeeBreakdown,
    ) -> Result<bool, EscrowRepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Accepted.to_string()),
            )
            .col_expr(task_entity::Column::DoerId, Expr::value(Some(doer_id)))
            .col_expr(task_entity::Column::AcceptedAt, Expr::value(Some(now)))
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Id.eq(task_id))
            .filter(task_entity::Column::Status.eq(TaskStatus::Open.to_string()))
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            txn.commit().await?;
            return Ok(false);
        }

        // 赢得接受竞态的调用在同一事务内锁定费用拆分
        escrow_entity::Entity::update_many()
            .col_expr(escrow_entity::Column::DoerId, Expr::value(Some(doer_id)))
            .col_expr(
                escrow_entity::Column::PlatformFee,
                Expr::value(Some(fee.platform_fee)),
            )
            .col_expr(
                escrow_entity::Column::NetPayout,
                Expr::value(Some(fee.net_payout)),
            )
            .col_expr(
                escrow_entity::Column::AppliedFeeBps,
                Expr::value(Some(fee.applied_fee_bps as i32)),
            )
            .col_expr(
                escrow_entity::Column::TaskTierFeeBps,
                Expr::value(Some(fee.task_tier_fee_bps as i32)),
            )
            .col_expr(
                escrow_entity::Column::ValueTierFeeBps,
                Expr::value(fee.value_tier_fee_bps.map(|v| v as i32)),
            )
            .col_expr(escrow_entity::Column::UpdatedAt, Expr::value(now))
            .filter(escrow_entity::Column::TaskId.eq(task_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn start(&self, task_id: Uuid, doer_id: Uuid) -> Result<bool, EscrowRepositoryError> {
        let now = Utc::now().fixed_offset();
        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::InProgress.to_string()),
            )
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Id.eq(task_id))
            .filter(task_entity::Column::Status.eq(TaskStatus::Accepted.to_string()))
            .filter(task_entity::Column::DoerId.eq(doer_id))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn submit(
        &self,
        task_id: Uuid,
        doer_id: Uuid,
        review_deadline: DateTime<FixedOffset>,
    ) -> Result<bool, EscrowRepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        let result = task_entity::Entity::update_many()
            .col_expr(
                task_entity::Column::Status,
                Expr::value(TaskStatus::Submitted.to_string()),
            )
            .col_expr(task_entity::Column::SubmittedAt, Expr::value(Some(now)))
            .col_expr(
                task_entity::Column::ReviewDeadline,
                Expr::value(Some(review_deadline)),
            )
            .col_expr(task_entity::Column::UpdatedAt, Expr::value(now))
            .filter(task_entity::Column::Id.eq(task_id))
            .filter(task_entity::Column::Status.eq(TaskStatus::InProgress.to_string()))
            .filter(task_entity::Column::DoerId.eq(doer_id))
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            txn.commit().await?;
            return Ok(false);
        }

        escrow_entity::Entity::update_many()
            .col_expr(
                escrow_entity::Column::AutoReleaseAt,
                Expr::value(Some(review_deadline)),
            )
            .col_expr(escrow_entity::Column::UpdatedAt, Expr::value(now))
            .filter(escrow_entity::Column::TaskId.eq(task_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn open_dispute(&self, dispute: &Dispute) -> Result<bool, EscrowRepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        if !Self::advance_task(&txn, dispute.task_id, TaskStatus::Submitted, TaskStatus::Disputed, now)
            .await?
        {
            txn.commit().await?;
            return Ok(false);
        }

        // 清除自动放款时间，同时挡住清扫与手动批准
        escrow_entity::Entity::update_many()
            .col_expr(
                escrow_entity::Column::AutoReleaseAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(escrow_entity::Column::UpdatedAt, Expr::value(now))
            .filter(escrow_entity::Column::TaskId.eq(dispute.task_id))
            .exec(&txn)
            .await?;

        let dispute_model = dispute_entity::ActiveModel {
            id: Set(dispute.id),
            task_id: Set(dispute.task_id),
            escrow_id: Set(dispute.escrow_id),
            raised_by: Set(dispute.raised_by),
            reason: Set(dispute.reason.clone()),
            status: Set(dispute.status.to_string()),
            outcome: Set(None),
            doer_amount: Set(None),
            poster_amount: Set(None),
            resolver_id: Set(None),
            resolved_at: Set(None),
            created_at: Set(dispute.created_at),
        };
        dispute_model.insert(&txn).await?;

        txn.commit().await?;
        Ok(true)
    }

    async fn release(
        &self,
        task_id: Uuid,
        from: TaskStatus,
    ) -> Result<SettlementOutcome, EscrowRepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        if !Self::advance_task(&txn, task_id, from, TaskStatus::Completed, now).await? {
            txn.commit().await?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        if !Self::settle_escrow(&txn, task_id, EscrowStatus::Released, now).await? {
            // 任务赢了但托管已结算：不应出现，回滚并按已结算上报
            txn.rollback().await?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let escrow = Self::load_escrow(&txn, task_id).await?;
        let doer_id = escrow
            .doer_id
            .ok_or_else(|| DbErr::Custom(format!("escrow {} released without doer", escrow.id)))?;
        let net_payout = escrow.net_payout.ok_or_else(|| {
            DbErr::Custom(format!("escrow {} released without locked fee", escrow.id))
        })?;

        let event = Self::apply_wallet_delta(
            &txn,
            doer_id,
            net_payout,
            WalletEventType::EscrowRelease,
            Some(task_id),
            Some(escrow.id),
            true,
        )
        .await?;

        txn.commit().await?;
        Ok(SettlementOutcome::Settled {
            escrow: escrow.into(),
            wallet_events: vec![event],
        })
    }

    async fn refund(
        &self,
        task_id: Uuid,
        from: TaskStatus,
        task_final: TaskStatus,
    ) -> Result<SettlementOutcome, EscrowRepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        if !Self::advance_task(&txn, task_id, from, task_final, now).await? {
            txn.commit().await?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        if !Self::settle_escrow(&txn, task_id, EscrowStatus::Refunded, now).await? {
            txn.rollback().await?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let escrow = Self::load_escrow(&txn, task_id).await?;
        let event = Self::apply_wallet_delta(
            &txn,
            escrow.poster_id,
            escrow.gross_amount,
            WalletEventType::EscrowRefund,
            Some(task_id),
            Some(escrow.id),
            false,
        )
        .await?;

        txn.commit().await?;
        Ok(SettlementOutcome::Settled {
            escrow: escrow.into(),
            wallet_events: vec![event],
        })
    }

    async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        outcome: DisputeOutcome,
        doer_amount: i64,
        poster_amount: i64,
        resolver_id: Uuid,
    ) -> Result<DisputeResolution, EscrowRepositoryError> {
        let txn = self.db.begin().await?;
        let now = Utc::now().fixed_offset();

        // 争议行是竞态锚点：第一个把 open 翻成 resolved 的调用获胜
        let result = dispute_entity::Entity::update_many()
            .col_expr(dispute_entity::Column::Status, Expr::value("resolved"))
            .col_expr(
                dispute_entity::Column::Outcome,
                Expr::value(Some(outcome.to_string())),
            )
            .col_expr(
                dispute_entity::Column::DoerAmount,
                Expr::value(Some(doer_amount)),
            )
            .col_expr(
                dispute_entity::Column::PosterAmount,
                Expr::value(Some(poster_amount)),
            )
            .col_expr(
                dispute_entity::Column::ResolverId,
                Expr::value(Some(resolver_id)),
            )
            .col_expr(dispute_entity::Column::ResolvedAt, Expr::value(Some(now)))
            .filter(dispute_entity::Column::Id.eq(dispute_id))
            .filter(dispute_entity::Column::Status.eq("open"))
            .exec(&txn)
            .await?;

        if result.rows_affected != 1 {
            txn.commit().await?;
            return Ok(DisputeResolution::AlreadyResolved);
        }

        let dispute = dispute_entity::Entity::find_by_id(dispute_id)
            .one(&txn)
            .await?
            .ok_or_else(|| DbErr::Custom(format!("dispute {} vanished", dispute_id)))?;
        let task_id = dispute.task_id;

        // 任何裁决结果下任务都进入 completed
        if !Self::advance_task(&txn, task_id, TaskStatus::Disputed, TaskStatus::Completed, now)
            .await?
        {
            return Err(EscrowRepositoryError::Database(DbErr::Custom(format!(
                "dispute {} resolved but task {} is not disputed",
                dispute_id, task_id
            ))));
        }

        let escrow_status = match outcome {
            DisputeOutcome::Approve => EscrowStatus::Released,
            DisputeOutcome::Reject => EscrowStatus::Refunded,
            DisputeOutcome::Split => EscrowStatus::Split,
        };
        if !Self::settle_escrow(&txn, task_id, escrow_status, now).await? {
            return Err(EscrowRepositoryError::Database(DbErr::Custom(format!(
                "dispute {} resolved but escrow is already settled",
                dispute_id
            ))));
        }

        let escrow = Self::load_escrow(&txn, task_id).await?;

        if doer_amount > 0 {
            let doer_id = escrow.doer_id.ok_or_else(|| {
                DbErr::Custom(format!("escrow {} has no doer to pay", escrow.id))
            })?;
            let (event_type, count_completion) = match outcome {
                DisputeOutcome::Approve => (WalletEventType::EscrowRelease, true),
                _ => (WalletEventType::DisputePayout, false),
            };
            Self::apply_wallet_delta(
                &txn,
                doer_id,
                doer_amount,
                event_type,
                Some(task_id),
                Some(escrow.id),
                count_completion,
            )
            .await?;
        }

        if poster_amount > 0 {
            let event_type = match outcome {
                DisputeOutcome::Reject => WalletEventType::EscrowRefund,
                _ => WalletEventType::DisputePayout,
            };
            Self::apply_wallet_delta(
                &txn,
                escrow.poster_id,
                poster_amount,
                event_type,
                Some(task_id),
                Some(escrow.id),
                false,
            )
            .await?;
        }

        txn.commit().await?;

        Ok(DisputeResolution::Applied(ResolutionRecord {
            dispute_id,
            task_id,
            outcome,
            doer_amount,
            poster_amount,
            resolver_id,
            resolved_at: now,
        }))
    }
}
