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
pub enum IdempotencyRepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// 幂等记录
///
/// 每个 (key, caller, endpoint) 组合只允许写入一次；
/// 记录保存请求指纹与完整的响应，用于重放。
#[derive(Debug, Clone)]
pub struct IdempotencyRecord {
    pub id: Uuid,
    pub key: String,
    pub caller_id: Uuid,
    pub endpoint: String,
    pub request_hash: String,
    pub response_status: u16,
    pub response_body: serde_json::Value,
    pub created_at: DateTime<FixedOffset>,
}

/// 幂等仓库特质
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    /// 查找指定作用域内的幂等记录
    async fn find(
        &self,
        key: &str,
        caller_id: Uuid,
        endpoint: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyRepositoryError>;

    /// 写入一次性记录
    ///
    /// 返回 false 表示唯一索引冲突（另一并发调用已写入），
    /// 调用方应重新读取并按重放或冲突处理。
    async fn insert_once(
        &self,
        record: &IdempotencyRecord,
    ) -> Result<bool, IdempotencyRepositoryError>;
}
