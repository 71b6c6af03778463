// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::task::{Task, TaskStatus};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 任务查询参数
#[derive(Debug, Default, Clone)]
pub struct TaskQueryParams {
    /// 按发布者或执行者过滤（任一身份匹配即可）
    pub participant: Option<Uuid>,
    pub statuses: Option<Vec<TaskStatus>>,
    pub created_after: Option<DateTime<FixedOffset>>,
    pub created_before: Option<DateTime<FixedOffset>>,
    pub limit: u32,
    pub offset: u32,
}

/// 任务仓库特质
///
/// 任务的读取与查询接口。所有涉及资金或状态的写入都
/// 经由托管仓库的结算端口完成，这里只提供读路径。
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// 根据ID查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError>;
    /// 高级任务查询
    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<Task>, u64), RepositoryError>;
    /// 查找审核窗口已过期、等待自动放款的任务
    async fn list_release_due(
        &self,
        now: DateTime<FixedOffset>,
        limit: u32,
    ) -> Result<Vec<Task>, RepositoryError>;
}
