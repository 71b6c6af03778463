// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::repositories::idempotency_repository::{
    IdempotencyRecord, IdempotencyRepository, IdempotencyRepositoryError,
};
use crate::infrastructure::database::entities::idempotency_key as key_entity;

pub struct IdempotencyRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl IdempotencyRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<key_entity::Model> for IdempotencyRecord {
    fn from(model: key_entity::Model) -> Self {
        Self {
            id: model.id,
            key: model.key,
            caller_id: model.caller_id,
            endpoint: model.endpoint,
            request_hash: model.request_hash,
            response_status: model.response_status as u16,
            response_body: model.response_body,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl IdempotencyRepository for IdempotencyRepositoryImpl {
    async fn find(
        &self,
        key: &str,
        caller_id: Uuid,
        endpoint: &str,
    ) -> Result<Option<IdempotencyRecord>, IdempotencyRepositoryError> {
        let model = key_entity::Entity::find()
            .filter(key_entity::Column::Key.eq(key))
            .filter(key_entity::Column::CallerId.eq(caller_id))
            .filter(key_entity::Column::Endpoint.eq(endpoint))
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn insert_once(
        &self,
        record: &IdempotencyRecord,
    ) -> Result<bool, IdempotencyRepositoryError> {
        let model = key_entity::ActiveModel {
            id: Set(record.id),
            key: Set(record.key.clone()),
            caller_id: Set(record.caller_id),
            endpoint: Set(record.endpoint.clone()),
            request_hash: Set(record.request_hash.clone()),
            response_status: Set(record.response_status as i32),
            response_body: Set(record.response_body.clone()),
            created_at: Set(record.created_at),
        };

        // 唯一索引 (key, caller, endpoint) 挡住并发重复写入；
        // 插入失败时确认确有既存记录再按竞态落败返回
        match model.insert(self.db.as_ref()).await {
            Ok(_) => Ok(true),
            Err(insert_err) => {
                let existing = self
                    .find(&record.key, record.caller_id, &record.endpoint)
                    .await?;
                if existing.is_some() {
                    Ok(false)
                } else {
                    Err(insert_err.into())
                }
            }
        }
    }
}
