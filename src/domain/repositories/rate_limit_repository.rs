// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RateLimitRepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// 限流记录
///
/// 每个被放行的请求一条记录，只按时间计数和过期，从不更新。
#[derive(Debug, Clone)]
pub struct RateLimitEntry {
    pub id: Uuid,
    pub identifier: String,
    pub operation: String,
    pub window_start: DateTime<FixedOffset>,
}

/// 限流仓库特质
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// 统计窗口内的记录数
    async fn count_since(
        &self,
        identifier: &str,
        operation: &str,
        since: DateTime<FixedOffset>,
    ) -> Result<u64, RateLimitRepositoryError>;

    /// 为当前请求写入一条记录
    async fn insert(&self, entry: &RateLimitEntry) -> Result<(), RateLimitRepositoryError>;

    /// 清理早于截止时间的过期记录
    async fn purge_before(
        &self,
        cutoff: DateTime<FixedOffset>,
    ) -> Result<u64, RateLimitRepositoryError>;
}
