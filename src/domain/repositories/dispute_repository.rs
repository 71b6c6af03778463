// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::dispute::Dispute;

#[derive(Error, Debug)]
pub enum DisputeRepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Record not found")]
    NotFound,
}

/// 争议仓库特质
///
/// 争议的读取接口。争议的创建与裁决属于资金结算事务，
/// 由托管仓库的结算端口完成。
#[async_trait]
pub trait DisputeRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Dispute>, DisputeRepositoryError>;

    async fn find_by_task_id(
        &self,
        task_id: Uuid,
    ) -> Result<Option<Dispute>, DisputeRepositoryError>;

    /// 列出待裁决的争议，最早优先
    async fn list_open(&self, limit: u32) -> Result<Vec<Dispute>, DisputeRepositoryError>;
}
