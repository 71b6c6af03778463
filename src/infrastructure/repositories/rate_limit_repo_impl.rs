// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use std::sync::Arc;

use crate::domain::repositories::rate_limit_repository::{
    RateLimitEntry, RateLimitRepository, RateLimitRepositoryError,
};
use crate::infrastructure::database::entities::rate_limit_entry as entry_entity;

pub struct RateLimitRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl RateLimitRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RateLimitRepository for RateLimitRepositoryImpl {
    async fn count_since(
        &self,
        identifier: &str,
        operation: &str,
        since: DateTime<FixedOffset>,
    ) -> Result<u64, RateLimitRepositoryError> {
        let count = entry_entity::Entity::find()
            .filter(entry_entity::Column::Identifier.eq(identifier))
            .filter(entry_entity::Column::Operation.eq(operation))
            .filter(entry_entity::Column::WindowStart.gte(since))
            .count(self.db.as_ref())
            .await?;

        Ok(count)
    }

    async fn insert(&self, entry: &RateLimitEntry) -> Result<(), RateLimitRepositoryError> {
        let model = entry_entity::ActiveModel {
            id: Set(entry.id),
            identifier: Set(entry.identifier.clone()),
            operation: Set(entry.operation.clone()),
            window_start: Set(entry.window_start),
        };
        model.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn purge_before(
        &self,
        cutoff: DateTime<FixedOffset>,
    ) -> Result<u64, RateLimitRepositoryError> {
        let result = entry_entity::Entity::delete_many()
            .filter(entry_entity::Column::WindowStart.lt(cutoff))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}
