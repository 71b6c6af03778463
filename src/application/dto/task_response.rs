// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::escrow::EscrowStatus;
use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::services::task_service::{SweepOutcome, SweepReport, TaskWithEscrow};

/// 托管视图
#[derive(Debug, Serialize, Deserialize)]
pub struct EscrowViewDto {
    pub id: Uuid,
    pub status: EscrowStatus,
    pub gross_amount: i64,
    pub platform_fee: Option<i64>,
    pub net_payout: Option<i64>,
    pub applied_fee_bps: Option<i32>,
    pub auto_release_at: Option<DateTime<FixedOffset>>,
    pub released_at: Option<DateTime<FixedOffset>>,
}

/// 任务响应数据传输对象
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskResponseDto {
    pub id: Uuid,
    pub poster_id: Uuid,
    pub doer_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub reward_amount: i64,
    pub status: TaskStatus,
    pub deadline: DateTime<FixedOffset>,
    pub review_deadline: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub escrow: EscrowViewDto,
}

impl From<TaskWithEscrow> for TaskResponseDto {
    fn from(view: TaskWithEscrow) -> Self {
        Self {
            id: view.task.id,
            poster_id: view.task.poster_id,
            doer_id: view.task.doer_id,
            title: view.task.title,
            description: view.task.description,
            reward_amount: view.task.reward_amount,
            status: view.task.status,
            deadline: view.task.deadline,
            review_deadline: view.task.review_deadline,
            created_at: view.task.created_at,
            escrow: EscrowViewDto {
                id: view.escrow.id,
                status: view.escrow.status,
                gross_amount: view.escrow.gross_amount,
                platform_fee: view.escrow.platform_fee,
                net_payout: view.escrow.net_payout,
                applied_fee_bps: view.escrow.applied_fee_bps,
                auto_release_at: view.escrow.auto_release_at,
                released_at: view.escrow.released_at,
            },
        }
    }
}

/// 任务摘要，列表查询使用
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskSummaryDto {
    pub id: Uuid,
    pub title: String,
    pub reward_amount: i64,
    pub status: TaskStatus,
    pub deadline: DateTime<FixedOffset>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<Task> for TaskSummaryDto {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            reward_amount: task.reward_amount,
            status: task.status,
            deadline: task.deadline,
            created_at: task.created_at,
        }
    }
}

/// 任务列表响应
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponseDto {
    pub tasks: Vec<TaskSummaryDto>,
    pub total: u64,
}

/// 放款响应：released 表示本次调用完成了放款，
/// already_released 表示竞态对方已完成，属于良性空操作
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReleaseResponseDto {
    Released { task: Box<TaskResponseDto> },
    AlreadyReleased,
}

/// 清扫单项结果
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepEntryDto {
    pub task_id: Uuid,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 清扫报告响应
#[derive(Debug, Serialize, Deserialize)]
pub struct SweepResponseDto {
    pub processed: usize,
    pub released: usize,
    pub skipped: usize,
    pub failed: usize,
    pub results: Vec<SweepEntryDto>,
}

impl From<SweepReport> for SweepResponseDto {
    fn from(report: SweepReport) -> Self {
        Self {
            processed: report.processed,
            released: report.released,
            skipped: report.skipped,
            failed: report.failed,
            results: report
                .results
                .into_iter()
                .map(|(task_id, outcome)| match outcome {
                    SweepOutcome::Released => SweepEntryDto {
                        task_id,
                        outcome: "released".to_string(),
                        error: None,
                    },
                    SweepOutcome::Skipped => SweepEntryDto {
                        task_id,
                        outcome: "skipped".to_string(),
                        error: None,
                    },
                    SweepOutcome::Error(e) => SweepEntryDto {
                        task_id,
                        outcome: "error".to_string(),
                        error: Some(e),
                    },
                })
                .collect(),
        }
    }
}
