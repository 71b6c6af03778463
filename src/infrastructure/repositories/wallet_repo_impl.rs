// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    models::wallet::{WalletBalance, WalletEvent, WalletEventType},
    repositories::wallet_repository::{WalletRepository, WalletRepositoryError},
};

use crate::infrastructure::database::entities::{
    wallet_balance as balance_entity, wallet_event as event_entity,
};

pub struct WalletRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl WalletRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    async fn apply_delta(
        &self,
        user_id: Uuid,
        delta: i64,
        event_type: WalletEventType,
        task_id: Option<Uuid>,
        escrow_id: Option<Uuid>,
    ) -> Result<WalletEvent, WalletRepositoryError> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        let wallet = match balance_entity::Entity::find_by_id(user_id)
            .one(&txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?
        {
            Some(model) => model,
            None => {
                let now = Utc::now().fixed_offset();
                balance_entity::ActiveModel {
                    user_id: Set(user_id),
                    balance: Set(0),
                    total_earned: Set(0),
                    completed_tasks: Set(0),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await
                .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?
            }
        };

        let balance_before = wallet.balance;
        let balance_after = balance_before + delta;

        if balance_after < 0 {
            return Err(WalletRepositoryError::InsufficientFunds {
                available: balance_before,
                required: -delta,
            });
        }

        let now = Utc::now().fixed_offset();
        let mut active: balance_entity::ActiveModel = wallet.into();
        active.balance = Set(balance_after);
        active.updated_at = Set(now);
        active
            .update(&txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        let event = event_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            event_type: Set(event_type.to_string()),
            amount: Set(delta),
            balance_before: Set(balance_before),
            balance_after: Set(balance_after),
            task_id: Set(task_id),
            escrow_id: Set(escrow_id),
            created_at: Set(now),
        };
        let inserted = event
            .insert(&txn)
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        Ok(inserted.into())
    }
}

impl From<balance_entity::Model> for WalletBalance {
    fn from(model: balance_entity::Model) -> Self {
        Self {
            user_id: model.user_id,
            balance: model.balance,
            total_earned: model.total_earned,
            completed_tasks: model.completed_tasks,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<event_entity::Model> for WalletEvent {
    fn from(model: event_entity::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            event_type: model
                .event_type
                .parse()
                .unwrap_or(WalletEventType::Adjustment),
            amount: model.amount,
            balance_before: model.balance_before,
            balance_after: model.balance_after,
            task_id: model.task_id,
            escrow_id: model.escrow_id,
            created_at: model.created_at,
        }
    }
}

#[async_trait]
impl WalletRepository for WalletRepositoryImpl {
    async fn get_or_init(&self, user_id: Uuid) -> Result<WalletBalance, WalletRepositoryError> {
        let existing = balance_entity::Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        if let Some(model) = existing {
            return Ok(model.into());
        }

        let now = Utc::now().fixed_offset();
        let fresh = balance_entity::ActiveModel {
            user_id: Set(user_id),
            balance: Set(0),
            total_earned: Set(0),
            completed_tasks: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = fresh
            .insert(self.db.as_ref())
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        Ok(inserted.into())
    }

    async fn credit(
        &self,
        user_id: Uuid,
        amount: i64,
        event_type: WalletEventType,
        task_id: Option<Uuid>,
        escrow_id: Option<Uuid>,
    ) -> Result<WalletEvent, WalletRepositoryError> {
        self.apply_delta(user_id, amount, event_type, task_id, escrow_id)
            .await
    }

    async fn debit(
        &self,
        user_id: Uuid,
        amount: i64,
        event_type: WalletEventType,
        task_id: Option<Uuid>,
        escrow_id: Option<Uuid>,
    ) -> Result<WalletEvent, WalletRepositoryError> {
        self.apply_delta(user_id, -amount, event_type, task_id, escrow_id)
            .await
    }

    async fn get_event_history(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<WalletEvent>, WalletRepositoryError> {
        let mut query = event_entity::Entity::find()
            .filter(event_entity::Column::UserId.eq(user_id))
            .order_by_asc(event_entity::Column::CreatedAt);

        if let Some(limit) = limit {
            query = query.limit(limit as u64);
        }

        let events = query
            .all(self.db.as_ref())
            .await
            .map_err(|e| WalletRepositoryError::DatabaseError(e.to_string()))?;

        Ok(events.into_iter().map(Into::into).collect())
    }
}
