// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::task::{Task, TaskStatus};
use crate::domain::repositories::task_repository::{
    RepositoryError, TaskQueryParams, TaskRepository,
};
use crate::infrastructure::database::entities::task as task_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 任务仓库实现
///
/// 基于SeaORM实现的任务读取层。写路径统一走托管仓库。
#[derive(Clone)]
pub struct TaskRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl TaskRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<task_entity::Model> for Task {
    fn from(model: task_entity::Model) -> Self {
        Self {
            id: model.id,
            poster_id: model.poster_id,
            doer_id: model.doer_id,
            title: model.title,
            description: model.description,
            reward_amount: model.reward_amount,
            status: model.status.parse().unwrap_or_default(),
            deadline: model.deadline,
            review_deadline: model.review_deadline,
            accepted_at: model.accepted_at,
            submitted_at: model.submitted_at,
            completed_at: model.completed_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Task> for task_entity::ActiveModel {
    fn from(task: &Task) -> Self {
        Self {
            id: Set(task.id),
            poster_id: Set(task.poster_id),
            doer_id: Set(task.doer_id),
            title: Set(task.title.clone()),
            description: Set(task.description.clone()),
            reward_amount: Set(task.reward_amount),
            status: Set(task.status.to_string()),
            deadline: Set(task.deadline),
            review_deadline: Set(task.review_deadline),
            accepted_at: Set(task.accepted_at),
            submitted_at: Set(task.submitted_at),
            completed_at: Set(task.completed_at),
            created_at: Set(task.created_at),
            updated_at: Set(task.updated_at),
        }
    }
}

#[async_trait]
impl TaskRepository for TaskRepositoryImpl {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, RepositoryError> {
        let model = task_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn query_tasks(
        &self,
        params: TaskQueryParams,
    ) -> Result<(Vec<Task>, u64), RepositoryError> {
        let mut query = task_entity::Entity::find();

        if let Some(participant) = params.participant {
            query = query.filter(
                Condition::any()
                    .add(task_entity::Column::PosterId.eq(participant))
                    .add(task_entity::Column::DoerId.eq(participant)),
            );
        }

        if let Some(statuses) = params.statuses {
            let values: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
            query = query.filter(task_entity::Column::Status.is_in(values));
        }

        if let Some(after) = params.created_after {
            query = query.filter(task_entity::Column::CreatedAt.gte(after));
        }

        if let Some(before) = params.created_before {
            query = query.filter(task_entity::Column::CreatedAt.lte(before));
        }

        let total = query.clone().count(self.db.as_ref()).await?;

        let limit = if params.limit == 0 { 100 } else { params.limit };
        let models = query
            .order_by_desc(task_entity::Column::CreatedAt)
            .limit(limit as u64)
            .offset(params.offset as u64)
            .all(self.db.as_ref())
            .await?;

        Ok((models.into_iter().map(Into::into).collect(), total))
    }

    async fn list_release_due(
        &self,
        now: DateTime<FixedOffset>,
        limit: u32,
    ) -> Result<Vec<Task>, RepositoryError> {
        let models = task_entity::Entity::find()
            .filter(task_entity::Column::Status.eq(TaskStatus::Submitted.to_string()))
            .filter(task_entity::Column::ReviewDeadline.lte(now))
            .order_by_asc(task_entity::Column::ReviewDeadline)
            .limit(limit as u64)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
