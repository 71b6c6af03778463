// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::repositories::rate_limit_repository::{
    RateLimitEntry, RateLimitRepository, RateLimitRepositoryError,
};

/// 限流判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// 窗口内剩余配额；拒绝时恒为0
    pub remaining: u32,
}

/// 限流服务错误类型
#[derive(Error, Debug)]
pub enum RateLimitError {
    #[error("Storage error: {0}")]
    Storage(#[from] RateLimitRepositoryError),
}

/// 滑动窗口限流器
///
/// 按 (identifier, operation) 统计窗口内已放行的请求数；
/// 放行时为当前请求写入一条记录，拒绝时不写任何东西，
/// 被拒请求不占用后续窗口的配额。
///
/// 没有全局锁：并发请求可能让窗口短暂超出上限，超出量
/// 以在途并发数为界。这是软限流——状态机自身的条件更新
/// 才是硬性并发控制；需要硬上限的部署可以换成事务计数器。
pub struct SlidingWindowLimiter<R>
where
    R: RateLimitRepository,
{
    repository: Arc<R>,
}

impl<R> SlidingWindowLimiter<R>
where
    R: RateLimitRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// 尝试获取一次请求配额
    ///
    /// # 参数
    ///
    /// * `identifier` - 调用方标识（用户ID等）
    /// * `operation` - 操作名，窗口按操作独立计数
    /// * `max_requests` - 窗口内允许的最大请求数
    /// * `window_minutes` - 窗口长度（分钟）
    pub async fn try_acquire(
        &self,
        identifier: &str,
        operation: &str,
        max_requests: u32,
        window_minutes: i64,
    ) -> Result<RateLimitDecision, RateLimitError> {
        let now = Utc::now().fixed_offset();
        let since = now - Duration::minutes(window_minutes);

        let used = self
            .repository
            .count_since(identifier, operation, since)
            .await?;

        if used >= max_requests as u64 {
            return Ok(RateLimitDecision {
                allowed: false,
                remaining: 0,
            });
        }

        self.repository
            .insert(&RateLimitEntry {
                id: Uuid::new_v4(),
                identifier: identifier.to_string(),
                operation: operation.to_string(),
                window_start: now,
            })
            .await?;

        Ok(RateLimitDecision {
            allowed: true,
            remaining: (max_requests as u64 - used - 1) as u32,
        })
    }

    /// 清理已滑出所有窗口的过期记录
    pub async fn purge_expired(&self, older_than_minutes: i64) -> Result<u64, RateLimitError> {
        let cutoff = Utc::now().fixed_offset() - Duration::minutes(older_than_minutes);
        Ok(self.repository.purge_before(cutoff).await?)
    }
}
