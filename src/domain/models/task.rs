// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 任务实体
///
/// 表示市场中一个由发布者出资、执行者完成的工作单元。
/// 任务与一笔托管交易一一对应，生命周期内的所有状态变更
/// 都必须经过状态机的转换校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// 任务唯一标识符
    pub id: Uuid,
    /// 发布者ID，任务创建时出资方
    pub poster_id: Uuid,
    /// 执行者ID，任务被接受之前为空
    pub doer_id: Option<Uuid>,
    /// 任务标题
    pub title: String,
    /// 任务描述
    pub description: String,
    /// 报酬金额（最小货币单位），创建后不可变更
    pub reward_amount: i64,
    /// 任务状态，跟踪任务在其生命周期中的当前阶段
    pub status: TaskStatus,
    /// 任务截止时间
    pub deadline: DateTime<FixedOffset>,
    /// 审核窗口截止时间，提交交付物时设置
    pub review_deadline: Option<DateTime<FixedOffset>>,
    /// 接受时间
    pub accepted_at: Option<DateTime<FixedOffset>>,
    /// 提交时间
    pub submitted_at: Option<DateTime<FixedOffset>>,
    /// 完成时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 任务状态枚举
///
/// 状态转换表（唯一事实来源，未列出的转换一律拒绝）：
/// Open → Accepted | Cancelled
/// Accepted → InProgress | Cancelled
/// InProgress → Submitted
/// Submitted → Completed | Disputed
/// Disputed → Completed | Cancelled
/// Completed / Cancelled 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// 已发布，等待执行者接受
    #[default]
    Open,
    /// 已接受，执行者已确定，费用档位已锁定
    Accepted,
    /// 进行中，执行者已开始工作
    InProgress,
    /// 已提交，等待发布者审核或自动放款
    Submitted,
    /// 争议中，托管被锁定，等待仲裁结果
    Disputed,
    /// 已完成，托管已结算
    Completed,
    /// 已取消，托管已退款
    Cancelled,
}

impl TaskStatus {
    /// 判断状态是否为终态（无任何出边）
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// 校验从当前状态到目标状态的转换是否合法
    pub fn can_transition(self, to: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, to),
            (Open, Accepted)
                | (Open, Cancelled)
                | (Accepted, InProgress)
                | (Accepted, Cancelled)
                | (InProgress, Submitted)
                | (Submitted, Completed)
                | (Submitted, Disputed)
                | (Disputed, Completed)
                | (Disputed, Cancelled)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Open => write!(f, "open"),
            TaskStatus::Accepted => write!(f, "accepted"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Submitted => write!(f, "submitted"),
            TaskStatus::Disputed => write!(f, "disputed"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "accepted" => Ok(TaskStatus::Accepted),
            "in_progress" => Ok(TaskStatus::InProgress),
            "submitted" => Ok(TaskStatus::Submitted),
            "disputed" => Ok(TaskStatus::Disputed),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 无效的状态转换，当任务状态转换不符合转换表时发生
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: TaskStatus, to: TaskStatus },

    /// 验证错误，当输入数据不符合领域规则时发生
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl Task {
    /// 创建一个新的任务
    ///
    /// # 参数
    ///
    /// * `poster_id` - 发布者ID
    /// * `title` - 任务标题
    /// * `description` - 任务描述
    /// * `reward_amount` - 报酬金额（最小货币单位）
    /// * `deadline` - 任务截止时间
    ///
    /// # 返回值
    ///
    /// * `Ok(Task)` - 新创建的任务，初始状态为Open
    /// * `Err(DomainError)` - 输入不符合领域规则
    pub fn new(
        poster_id: Uuid,
        title: String,
        description: String,
        reward_amount: i64,
        deadline: DateTime<FixedOffset>,
    ) -> Result<Self, DomainError> {
        if reward_amount <= 0 {
            return Err(DomainError::ValidationError(
                "reward amount must be positive".to_string(),
            ));
        }
        if deadline <= Utc::now().fixed_offset() {
            return Err(DomainError::ValidationError(
                "deadline must be in the future".to_string(),
            ));
        }

        let now: DateTime<FixedOffset> = Utc::now().into();
        Ok(Self {
            id: Uuid::new_v4(),
            poster_id,
            doer_id: None,
            title,
            description,
            reward_amount,
            status: TaskStatus::Open,
            deadline,
            review_deadline: None,
            accepted_at: None,
            submitted_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// 校验并返回到目标状态的转换
    ///
    /// # 返回值
    ///
    /// * `Ok(())` - 转换合法
    /// * `Err(DomainError)` - 转换不在转换表中
    pub fn ensure_transition(&self, to: TaskStatus) -> Result<(), DomainError> {
        if self.status.can_transition(to) {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition {
                from: self.status,
                to,
            })
        }
    }
}
