// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::wallet::{WalletBalance, WalletEvent, WalletEventType};

#[derive(Error, Debug)]
pub enum WalletRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },
    #[error("Wallet not found for user: {0}")]
    WalletNotFound(Uuid),
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Get the balance projection for a user, creating an empty wallet if absent
    async fn get_or_init(&self, user_id: Uuid) -> Result<WalletBalance, WalletRepositoryError>;

    /// Credit a user's wallet; writes the event and the projection together
    async fn credit(
        &self,
        user_id: Uuid,
        amount: i64,
        event_type: WalletEventType,
        task_id: Option<Uuid>,
        escrow_id: Option<Uuid>,
    ) -> Result<WalletEvent, WalletRepositoryError>;

    /// Debit a user's wallet; fails if the resulting balance would be negative
    async fn debit(
        &self,
        user_id: Uuid,
        amount: i64,
        event_type: WalletEventType,
        task_id: Option<Uuid>,
        escrow_id: Option<Uuid>,
    ) -> Result<WalletEvent, WalletRepositoryError>;

    /// Get event history for a user, oldest first
    async fn get_event_history(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<WalletEvent>, WalletRepositoryError>;
}
