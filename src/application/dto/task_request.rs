// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::task::TaskStatus;

/// 创建任务请求数据传输对象
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateTaskRequestDto {
    /// 任务标题
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// 任务描述
    #[validate(length(min = 1, max = 10000))]
    pub description: String,
    /// 报酬金额（最小货币单位）
    #[validate(range(min = 1))]
    pub reward_amount: i64,
    /// 任务截止时间
    pub deadline: DateTime<FixedOffset>,
}

/// 发起争议请求数据传输对象
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct DisputeRequestDto {
    /// 争议原因
    #[validate(length(min = 1, max = 5000))]
    pub reason: String,
}

/// 任务列表查询参数
#[derive(Debug, Default, Deserialize)]
pub struct TaskListQueryDto {
    /// 按状态过滤
    pub status: Option<TaskStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
