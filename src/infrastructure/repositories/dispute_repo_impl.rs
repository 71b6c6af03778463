// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::models::dispute::{Dispute, DisputeStatus};
use crate::domain::repositories::dispute_repository::{DisputeRepository, DisputeRepositoryError};
use crate::infrastructure::database::entities::dispute as dispute_entity;

pub struct DisputeRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl DisputeRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<dispute_entity::Model> for Dispute {
    fn from(model: dispute_entity::Model) -> Self {
        Self {
            id: model.id,
            task_id: model.task_id,
            escrow_id: model.escrow_id,
            raised_by: model.raised_by,
            reason: model.reason,
            status: model.status.parse().unwrap_or_default(),
            outcome: model.outcome.and_then(|o| o.parse().ok()),
            doer_amount: model.doer_amount,
            poster_amount: model.poster_amount,
            resolver_id: model.resolver_id,
            resolved_at: model.resolved_at,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl DisputeRepository for DisputeRepositoryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Dispute>, DisputeRepositoryError> {
        let model = dispute_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn find_by_task_id(
        &self,
        task_id: Uuid,
    ) -> Result<Option<Dispute>, DisputeRepositoryError> {
        let model = dispute_entity::Entity::find()
            .filter(dispute_entity::Column::TaskId.eq(task_id))
            .order_by_desc(dispute_entity::Column::CreatedAt)
            .one(self.db.as_ref())
            .await?;
        Ok(model.map(Into::into))
    }

    async fn list_open(&self, limit: u32) -> Result<Vec<Dispute>, DisputeRepositoryError> {
        let models = dispute_entity::Entity::find()
            .filter(dispute_entity::Column::Status.eq(DisputeStatus::Open.to_string()))
            .order_by_asc(dispute_entity::Column::CreatedAt)
            .limit(limit as u64)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
