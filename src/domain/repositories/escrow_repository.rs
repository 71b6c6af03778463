// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::dispute::{Dispute, DisputeOutcome, ResolutionRecord};
use crate::domain::models::escrow::{EscrowTransaction, FeeBreakdown};
use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::models::wallet::WalletEvent;

#[derive(Error, Debug)]
pub enum EscrowRepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Record not found")]
    NotFound,
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },
}

/// 结算结果
///
/// 条件更新决出唯一赢家：赢家拿到结算详情，
/// 输家观察到 AlreadySettled（良性竞态，不是错误）。
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// 本次调用完成了结算
    Settled {
        escrow: EscrowTransaction,
        wallet_events: Vec<WalletEvent>,
    },
    /// 托管已被其他调用结算（或任务已不在预期状态）
    AlreadySettled,
}

/// 争议裁决结果
#[derive(Debug, Clone)]
pub enum DisputeResolution {
    Applied(ResolutionRecord),
    AlreadyResolved,
}

/// 托管仓库特质
///
/// 状态机的结算端口。每个方法都是一个完整的事务边界：
/// 任务状态、托管状态、钱包事件与余额投影要么全部提交，
/// 要么全部回滚，不存在部分生效的资金变动。
/// 条件转换方法返回本次调用是否赢得了状态更新。
#[async_trait]
pub trait EscrowRepository: Send + Sync {
    /// 根据托管ID查找
    async fn find_by_id(&self, id: Uuid)
        -> Result<Option<EscrowTransaction>, EscrowRepositoryError>;

    /// 根据任务ID查找
    async fn find_by_task_id(
        &self,
        task_id: Uuid,
    ) -> Result<Option<EscrowTransaction>, EscrowRepositoryError>;

    /// 创建任务并注资托管
    ///
    /// 单事务：写入任务（open）、托管（held），并从发布者
    /// 钱包扣除全额报酬。余额不足时整个操作失败。
    async fn fund(
        &self,
        task: &Task,
        escrow: &EscrowTransaction,
    ) -> Result<WalletEvent, EscrowRepositoryError>;

    /// 接受任务并锁定费用
    ///
    /// 条件更新 open → accepted，同一事务内把费用拆分写入托管。
    /// 返回 false 表示竞态失败（任务已不在 open 状态）。
    async fn accept(
        &self,
        task_id: Uuid,
        doer_id: Uuid,
        fee: &FeeBreakdown,
    ) -> Result<bool, EscrowRepositoryError>;

    /// 开始工作：条件更新 accepted → in_progress，仅限被指派的执行者
    async fn start(&self, task_id: Uuid, doer_id: Uuid) -> Result<bool, EscrowRepositoryError>;

    /// 提交交付物
    ///
    /// 条件更新 in_progress → submitted，同一事务内在任务上
    /// 设置审核截止时间、在托管上设置自动放款时间。
    async fn submit(
        &self,
        task_id: Uuid,
        doer_id: Uuid,
        review_deadline: DateTime<FixedOffset>,
    ) -> Result<bool, EscrowRepositoryError>;

    /// 发起争议
    ///
    /// 条件更新 submitted → disputed，清除自动放款时间
    /// （同时锁住手动批准与清扫），并插入争议记录。
    async fn open_dispute(&self, dispute: &Dispute) -> Result<bool, EscrowRepositoryError>;

    /// 放款给执行者
    ///
    /// 条件更新：任务 `from` → completed、托管 held → released，
    /// 同一事务内给执行者入账净收入并累加其完成任务数。
    /// 竞态输家得到 AlreadySettled。
    async fn release(
        &self,
        task_id: Uuid,
        from: TaskStatus,
    ) -> Result<SettlementOutcome, EscrowRepositoryError>;

    /// 退款给发布者
    ///
    /// 条件更新：任务 `from` → `task_final`、托管 held → refunded，
    /// 同一事务内把全额退回发布者钱包。
    async fn refund(
        &self,
        task_id: Uuid,
        from: TaskStatus,
        task_final: TaskStatus,
    ) -> Result<SettlementOutcome, EscrowRepositoryError>;

    /// 应用争议裁决
    ///
    /// 单事务：条件更新争议 open → resolved（竞态锚点），按裁决
    /// 结果结算托管（全额放款 / 全额退款 / 按比例拆分），任务
    /// 最终进入 completed。重复裁决得到 AlreadyResolved。
    async fn resolve_dispute(
        &self,
        dispute_id: Uuid,
        outcome: DisputeOutcome,
        doer_amount: i64,
        poster_amount: i64,
        resolver_id: Uuid,
    ) -> Result<DisputeResolution, EscrowRepositoryError>;
}
