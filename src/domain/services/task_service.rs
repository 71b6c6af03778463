// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::models::dispute::Dispute;
use crate::domain::models::escrow::{EscrowStatus, EscrowTransaction};
use crate::domain::models::principal::Principal;
use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::repositories::escrow_repository::{
    EscrowRepository, EscrowRepositoryError, SettlementOutcome,
};
use crate::domain::repositories::task_repository::{
    RepositoryError, TaskQueryParams, TaskRepository,
};
use crate::domain::repositories::wallet_repository::{WalletRepository, WalletRepositoryError};
use crate::domain::services::event_publisher::{DomainEvent, EventPublisher};
use crate::domain::services::fee_service::{FeeError, FeeService};

/// 任务流错误类型
///
/// 竞态落败（AlreadyAssigned、AlreadyReleased）是并发下的
/// 预期结果，调用方应将其与真实故障区分开来按良性空操作处理。
#[derive(Error, Debug)]
pub enum TaskFlowError {
    #[error("Invalid state transition for task {task_id}: {from} -> {to}")]
    InvalidState {
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    },

    #[error("Task {0} is already assigned")]
    AlreadyAssigned(Uuid),

    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("Task not found: {0}")]
    NotFound(Uuid),

    #[error("Actor is not permitted to perform this action")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for TaskFlowError {
    fn from(err: RepositoryError) -> Self {
        TaskFlowError::Internal(err.to_string())
    }
}

impl From<EscrowRepositoryError> for TaskFlowError {
    fn from(err: EscrowRepositoryError) -> Self {
        match err {
            EscrowRepositoryError::InsufficientFunds {
                available,
                required,
            } => TaskFlowError::InsufficientFunds {
                available,
                required,
            },
            other => TaskFlowError::Internal(other.to_string()),
        }
    }
}

impl From<WalletRepositoryError> for TaskFlowError {
    fn from(err: WalletRepositoryError) -> Self {
        match err {
            WalletRepositoryError::InsufficientFunds {
                available,
                required,
            } => TaskFlowError::InsufficientFunds {
                available,
                required,
            },
            other => TaskFlowError::Internal(other.to_string()),
        }
    }
}

impl From<FeeError> for TaskFlowError {
    fn from(err: FeeError) -> Self {
        match err {
            FeeError::NonPositiveAmount(_) => TaskFlowError::Validation(err.to_string()),
            FeeError::InvalidSchedule(_) => TaskFlowError::Internal(err.to_string()),
        }
    }
}

/// 创建任务命令
#[derive(Debug, Clone)]
pub struct CreateTaskCommand {
    pub title: String,
    pub description: String,
    pub reward_amount: i64,
    pub deadline: DateTime<FixedOffset>,
}

/// 任务与托管的组合视图，变更操作的返回值
#[derive(Debug, Clone)]
pub struct TaskWithEscrow {
    pub task: Task,
    pub escrow: EscrowTransaction,
}

/// 放款结果
#[derive(Debug, Clone)]
pub enum ReleaseResult {
    /// 本次调用完成了放款
    Released(TaskWithEscrow),
    /// 托管已被另一个调用方结算，良性空操作
    AlreadyReleased,
}

/// 清扫单项结果
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    Released,
    /// 被手动批准抢先，按已放款跳过
    Skipped,
    Error(String),
}

/// 清扫报告
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub processed: usize,
    pub released: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<(Uuid, SweepOutcome)>,
}

/// 任务/托管状态机
///
/// 系统中唯一允许写任务、托管与钱包记录的组件（账本除外）。
/// 每个操作先做角色与转换表校验，再通过托管仓库的条件更新
/// 落盘；资金与状态在同一个事务内变更。事件在提交后发布。
pub struct TaskService {
    task_repo: Arc<dyn TaskRepository>,
    escrow_repo: Arc<dyn EscrowRepository>,
    wallet_repo: Arc<dyn WalletRepository>,
    fee_service: FeeService,
    publisher: Arc<dyn EventPublisher>,
    /// 审核窗口时长，提交后超过该时长未处理即自动放款
    review_window: Duration,
}

impl TaskService {
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        escrow_repo: Arc<dyn EscrowRepository>,
        wallet_repo: Arc<dyn WalletRepository>,
        fee_service: FeeService,
        publisher: Arc<dyn EventPublisher>,
        review_window: Duration,
    ) -> Self {
        Self {
            task_repo,
            escrow_repo,
            wallet_repo,
            fee_service,
            publisher,
            review_window,
        }
    }

    /// 创建任务并注资托管
    ///
    /// 单事务：任务（open）+ 托管（held）+ 发布者钱包扣款。
    /// 费用在接受时才锁定，此时托管只携带总额。
    pub async fn create(
        &self,
        poster: Principal,
        command: CreateTaskCommand,
    ) -> Result<TaskWithEscrow, TaskFlowError> {
        let task = Task::new(
            poster.user_id,
            command.title,
            command.description,
            command.reward_amount,
            command.deadline,
        )
        .map_err(|e| TaskFlowError::Validation(e.to_string()))?;

        let escrow = EscrowTransaction::hold(task.id, poster.user_id, task.reward_amount);

        let wallet_event = self.escrow_repo.fund(&task, &escrow).await?;

        metrics::counter!("tasks_created_total").increment(1);
        info!(task_id = %task.id, reward = task.reward_amount, "Task created and escrow funded");

        self.publisher.publish(DomainEvent::WalletMutated {
            user_id: wallet_event.user_id,
            event_type: wallet_event.event_type,
            amount: wallet_event.amount,
            balance_after: wallet_event.balance_after,
        });

        self.fetch(task.id).await
    }

    /// 接受任务
    ///
    /// 条件更新决出唯一赢家；落败方得到 AlreadyAssigned。
    /// 费用拆分按实际执行者的完成任务数计算并在此刻锁定。
    pub async fn accept(
        &self,
        task_id: Uuid,
        doer: Principal,
    ) -> Result<TaskWithEscrow, TaskFlowError> {
        let task = self.load_task(task_id).await?;

        if task.poster_id == doer.user_id {
            return Err(TaskFlowError::Validation(
                "poster cannot accept their own task".to_string(),
            ));
        }
        if task.status != TaskStatus::Open {
            return Err(TaskFlowError::AlreadyAssigned(task_id));
        }

        let doer_wallet = self.wallet_repo.get_or_init(doer.user_id).await?;
        let fee = self
            .fee_service
            .compute_fee(task.reward_amount, doer_wallet.completed_tasks.max(0) as u64)?;

        if !self.escrow_repo.accept(task_id, doer.user_id, &fee).await? {
            return Err(TaskFlowError::AlreadyAssigned(task_id));
        }

        metrics::counter!("task_transitions_total", "to" => "accepted").increment(1);
        self.publisher.publish(DomainEvent::TaskTransitioned {
            task_id,
            from: TaskStatus::Open,
            to: TaskStatus::Accepted,
        });

        self.fetch(task_id).await
    }

    /// 开始工作，仅限被指派的执行者
    pub async fn start(
        &self,
        task_id: Uuid,
        doer: Principal,
    ) -> Result<TaskWithEscrow, TaskFlowError> {
        let task = self.load_task(task_id).await?;
        self.ensure_doer(&task, doer)?;
        self.ensure_transition(&task, TaskStatus::InProgress)?;

        if !self.escrow_repo.start(task_id, doer.user_id).await? {
            let current = self.load_task(task_id).await?;
            return Err(TaskFlowError::InvalidState {
                task_id,
                from: current.status,
                to: TaskStatus::InProgress,
            });
        }

        metrics::counter!("task_transitions_total", "to" => "in_progress").increment(1);
        self.publisher.publish(DomainEvent::TaskTransitioned {
            task_id,
            from: TaskStatus::Accepted,
            to: TaskStatus::InProgress,
        });

        self.fetch(task_id).await
    }

    /// 提交交付物，开启审核窗口
    pub async fn submit(
        &self,
        task_id: Uuid,
        doer: Principal,
    ) -> Result<TaskWithEscrow, TaskFlowError> {
        let task = self.load_task(task_id).await?;
        self.ensure_doer(&task, doer)?;
        self.ensure_transition(&task, TaskStatus::Submitted)?;

        let review_deadline = Utc::now().fixed_offset() + self.review_window;

        if !self
            .escrow_repo
            .submit(task_id, doer.user_id, review_deadline)
            .await?
        {
            let current = self.load_task(task_id).await?;
            return Err(TaskFlowError::InvalidState {
                task_id,
                from: current.status,
                to: TaskStatus::Submitted,
            });
        }

        metrics::counter!("task_transitions_total", "to" => "submitted").increment(1);
        info!(task_id = %task_id, review_deadline = %review_deadline, "Work submitted, review window opened");
        self.publisher.publish(DomainEvent::TaskTransitioned {
            task_id,
            from: TaskStatus::InProgress,
            to: TaskStatus::Submitted,
        });

        self.fetch(task_id).await
    }

    /// 发布者批准交付
    ///
    /// 批准即放款：与自动清扫共用同一条放款路径，
    /// 输掉竞态时得到良性的 AlreadyReleased。
    pub async fn approve(
        &self,
        task_id: Uuid,
        poster: Principal,
    ) -> Result<ReleaseResult, TaskFlowError> {
        let task = self.load_task(task_id).await?;
        if task.poster_id != poster.user_id {
            return Err(TaskFlowError::Forbidden);
        }
        self.ensure_transition(&task, TaskStatus::Completed)?;

        self.release(task_id).await
    }

    /// 放款给执行者
    ///
    /// 手动批准与调度清扫共用的唯一放款入口。对当前托管状态
    /// 幂等：第二个调用方观察到 AlreadyReleased 而不是错误。
    pub async fn release(&self, task_id: Uuid) -> Result<ReleaseResult, TaskFlowError> {
        match self
            .escrow_repo
            .release(task_id, TaskStatus::Submitted)
            .await?
        {
            SettlementOutcome::Settled {
                escrow,
                wallet_events,
            } => {
                metrics::counter!("escrow_settlements_total", "status" => "released").increment(1);
                info!(task_id = %task_id, escrow_id = %escrow.id, "Escrow released to doer");

                self.publisher.publish(DomainEvent::TaskTransitioned {
                    task_id,
                    from: TaskStatus::Submitted,
                    to: TaskStatus::Completed,
                });
                self.publisher.publish(DomainEvent::EscrowSettled {
                    escrow_id: escrow.id,
                    task_id,
                    status: EscrowStatus::Released,
                });
                for event in &wallet_events {
                    self.publisher.publish(DomainEvent::WalletMutated {
                        user_id: event.user_id,
                        event_type: event.event_type,
                        amount: event.amount,
                        balance_after: event.balance_after,
                    });
                }

                let view = self.fetch(task_id).await?;
                Ok(ReleaseResult::Released(view))
            }
            SettlementOutcome::AlreadySettled => Ok(ReleaseResult::AlreadyReleased),
        }
    }

    /// 发起争议，锁定托管
    pub async fn dispute(
        &self,
        task_id: Uuid,
        party: Principal,
        reason: String,
    ) -> Result<Dispute, TaskFlowError> {
        if reason.trim().is_empty() {
            return Err(TaskFlowError::Validation(
                "dispute reason cannot be empty".to_string(),
            ));
        }

        let task = self.load_task(task_id).await?;
        let is_party =
            task.poster_id == party.user_id || task.doer_id == Some(party.user_id);
        if !is_party {
            return Err(TaskFlowError::Forbidden);
        }
        self.ensure_transition(&task, TaskStatus::Disputed)?;

        let escrow = self.load_escrow(task_id).await?;
        let dispute = Dispute::raise(task_id, escrow.id, party.user_id, reason);

        if !self.escrow_repo.open_dispute(&dispute).await? {
            let current = self.load_task(task_id).await?;
            return Err(TaskFlowError::InvalidState {
                task_id,
                from: current.status,
                to: TaskStatus::Disputed,
            });
        }

        metrics::counter!("task_transitions_total", "to" => "disputed").increment(1);
        warn!(task_id = %task_id, raised_by = %party.user_id, "Dispute raised, escrow locked");
        self.publisher.publish(DomainEvent::TaskTransitioned {
            task_id,
            from: TaskStatus::Submitted,
            to: TaskStatus::Disputed,
        });

        Ok(dispute)
    }

    /// 取消任务并退款，仅限发布者、仅限 open/accepted
    pub async fn cancel(
        &self,
        task_id: Uuid,
        poster: Principal,
    ) -> Result<TaskWithEscrow, TaskFlowError> {
        // 和 accept 竞态时重读一次：open 下发起的取消可能
        // 在 accepted 状态下完成，两者都是合法的取消起点
        for _ in 0..2 {
            let task = self.load_task(task_id).await?;
            if task.poster_id != poster.user_id {
                return Err(TaskFlowError::Forbidden);
            }
            self.ensure_transition(&task, TaskStatus::Cancelled)?;

            match self
                .escrow_repo
                .refund(task_id, task.status, TaskStatus::Cancelled)
                .await?
            {
                SettlementOutcome::Settled {
                    escrow,
                    wallet_events,
                } => {
                    metrics::counter!("escrow_settlements_total", "status" => "refunded")
                        .increment(1);
                    info!(task_id = %task_id, "Task cancelled, escrow refunded to poster");

                    self.publisher.publish(DomainEvent::TaskTransitioned {
                        task_id,
                        from: task.status,
                        to: TaskStatus::Cancelled,
                    });
                    self.publisher.publish(DomainEvent::EscrowSettled {
                        escrow_id: escrow.id,
                        task_id,
                        status: EscrowStatus::Refunded,
                    });
                    for event in &wallet_events {
                        self.publisher.publish(DomainEvent::WalletMutated {
                            user_id: event.user_id,
                            event_type: event.event_type,
                            amount: event.amount,
                            balance_after: event.balance_after,
                        });
                    }

                    return self.fetch(task_id).await;
                }
                SettlementOutcome::AlreadySettled => continue,
            }
        }

        let current = self.load_task(task_id).await?;
        Err(TaskFlowError::InvalidState {
            task_id,
            from: current.status,
            to: TaskStatus::Cancelled,
        })
    }

    /// 自动放款清扫
    ///
    /// 找出审核窗口已过期的 submitted 任务并逐一走共用的放款
    /// 路径。单个任务的失败只记录在报告里，不会中断整批；
    /// 与手动批准竞态输掉的任务按 skipped 上报。清扫自身可以
    /// 安全并发运行，正确性依赖放款的条件更新而非外部锁。
    pub async fn sweep(&self, now: DateTime<FixedOffset>) -> Result<SweepReport, TaskFlowError> {
        let due = self.task_repo.list_release_due(now, 500).await?;

        let mut report = SweepReport {
            processed: due.len(),
            ..Default::default()
        };

        for task in due {
            match self.release(task.id).await {
                Ok(ReleaseResult::Released(_)) => {
                    report.released += 1;
                    report.results.push((task.id, SweepOutcome::Released));
                }
                Ok(ReleaseResult::AlreadyReleased) => {
                    report.skipped += 1;
                    report.results.push((task.id, SweepOutcome::Skipped));
                }
                Err(e) => {
                    error!(task_id = %task.id, error = %e, "Auto-release failed for task");
                    report.failed += 1;
                    report
                        .results
                        .push((task.id, SweepOutcome::Error(e.to_string())));
                }
            }
        }

        metrics::counter!("auto_release_sweeps_total").increment(1);
        if report.released > 0 || report.failed > 0 {
            info!(
                processed = report.processed,
                released = report.released,
                skipped = report.skipped,
                failed = report.failed,
                "Auto-release sweep finished"
            );
        }

        Ok(report)
    }

    /// 查询任务与托管的组合视图
    pub async fn fetch(&self, task_id: Uuid) -> Result<TaskWithEscrow, TaskFlowError> {
        let task = self.load_task(task_id).await?;
        let escrow = self.load_escrow(task_id).await?;
        Ok(TaskWithEscrow { task, escrow })
    }

    /// 按参与者/状态查询任务
    pub async fn query(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<Task>, u64), TaskFlowError> {
        Ok(self.task_repo.query_tasks(params).await?)
    }

    async fn load_task(&self, task_id: Uuid) -> Result<Task, TaskFlowError> {
        self.task_repo
            .find_by_id(task_id)
            .await?
            .ok_or(TaskFlowError::NotFound(task_id))
    }

    async fn load_escrow(&self, task_id: Uuid) -> Result<EscrowTransaction, TaskFlowError> {
        self.escrow_repo
            .find_by_task_id(task_id)
            .await?
            .ok_or(TaskFlowError::NotFound(task_id))
    }

    fn ensure_doer(&self, task: &Task, doer: Principal) -> Result<(), TaskFlowError> {
        if task.doer_id != Some(doer.user_id) {
            return Err(TaskFlowError::Forbidden);
        }
        Ok(())
    }

    fn ensure_transition(&self, task: &Task, to: TaskStatus) -> Result<(), TaskFlowError> {
        task.ensure_transition(to)
            .map_err(|_| TaskFlowError::InvalidState {
                task_id: task.id,
                from: task.status,
                to,
            })
    }
}
