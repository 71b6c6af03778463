// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::repositories::idempotency_repository::{
    IdempotencyRecord, IdempotencyRepository, IdempotencyRepositoryError,
};

/// 幂等检查结果
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// 首次见到该键，放行执行
    Fresh,
    /// 同键同请求体的重试，返回存储的原始响应，不再执行副作用
    Replay {
        status: u16,
        body: serde_json::Value,
    },
}

/// 幂等守卫错误类型
#[derive(Error, Debug)]
pub enum GuardError {
    /// 同键不同请求体，拒绝而非静默覆盖
    #[error("Idempotency key '{key}' was already used with a different payload")]
    Conflict { key: String },

    #[error("Storage error: {0}")]
    Storage(#[from] IdempotencyRepositoryError),
}

/// 幂等守卫
///
/// 以调用方提供的键对变更请求去重。键的作用域为
/// (caller, endpoint)，跨端点复用同一个键不算冲突。
/// 响应只在被包裹的操作成功之后记录，失败不污染键，
/// 调用方可以带着同一个键重试。
pub struct IdempotencyGuard<R>
where
    R: IdempotencyRepository,
{
    repository: Arc<R>,
}

impl<R> IdempotencyGuard<R>
where
    R: IdempotencyRepository,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// 计算请求体指纹
    ///
    /// serde_json 的 Map 按键有序，序列化结果对同一请求体稳定，
    /// 可以直接作为规范化表示参与哈希。
    pub fn fingerprint(body: &serde_json::Value) -> String {
        let canonical = body.to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(digest)
    }

    /// 检查请求是否可以执行
    ///
    /// # 返回值
    ///
    /// * `Ok(Admission::Fresh)` - 未见过该键，执行操作
    /// * `Ok(Admission::Replay)` - 同键同请求体，重放存储的响应
    /// * `Err(GuardError::Conflict)` - 同键不同请求体
    pub async fn admit(
        &self,
        key: &str,
        caller_id: Uuid,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> Result<Admission, GuardError> {
        match self.repository.find(key, caller_id, endpoint).await? {
            None => Ok(Admission::Fresh),
            Some(record) => {
                if record.request_hash == Self::fingerprint(body) {
                    Ok(Admission::Replay {
                        status: record.response_status,
                        body: record.response_body,
                    })
                } else {
                    Err(GuardError::Conflict {
                        key: key.to_string(),
                    })
                }
            }
        }
    }

    /// 在被包裹的操作成功后记录响应
    ///
    /// 唯一索引竞态（两个并发请求同键）由重新读取解决：
    /// 指纹一致视为对方已记录的重放，不一致上报冲突。
    pub async fn record(
        &self,
        key: &str,
        caller_id: Uuid,
        endpoint: &str,
        body: &serde_json::Value,
        response_status: u16,
        response_body: serde_json::Value,
    ) -> Result<(), GuardError> {
        let record = IdempotencyRecord {
            id: Uuid::new_v4(),
            key: key.to_string(),
            caller_id,
            endpoint: endpoint.to_string(),
            request_hash: Self::fingerprint(body),
            response_status,
            response_body,
            created_at: Utc::now().into(),
        };

        if self.repository.insert_once(&record).await? {
            return Ok(());
        }

        // 输掉了写入竞态，按对方的记录裁定重放或冲突
        match self.repository.find(key, caller_id, endpoint).await? {
            Some(existing) if existing.request_hash == record.request_hash => Ok(()),
            _ => Err(GuardError::Conflict {
                key: key.to_string(),
            }),
        }
    }
}
