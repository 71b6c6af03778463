// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::models::wallet::{WalletBalance, WalletEvent, WalletEventType};
use crate::domain::repositories::wallet_repository::{WalletRepository, WalletRepositoryError};
use crate::domain::services::event_publisher::{DomainEvent, EventPublisher};

/// 账本错误类型
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: available {available}, required {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<WalletRepositoryError> for LedgerError {
    fn from(err: WalletRepositoryError) -> Self {
        match err {
            WalletRepositoryError::InsufficientFunds {
                available,
                required,
            } => LedgerError::InsufficientFunds {
                available,
                required,
            },
            other => LedgerError::Internal(other.to_string()),
        }
    }
}

/// 钱包账本
///
/// 余额的唯一外部入口。入账无上限；出账不允许余额为负。
/// 每次变动都写一条带 balance_before/after 的流水事件，
/// 事件与余额投影在同一事务内落盘。
pub struct LedgerService {
    wallet_repo: Arc<dyn WalletRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl LedgerService {
    pub fn new(wallet_repo: Arc<dyn WalletRepository>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            wallet_repo,
            publisher,
        }
    }

    /// 充值（内部账务，非外部资金通道）
    pub async fn deposit(&self, user_id: Uuid, amount: i64) -> Result<WalletEvent, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::Validation(
                "deposit amount must be positive".to_string(),
            ));
        }

        let event = self
            .wallet_repo
            .credit(user_id, amount, WalletEventType::Deposit, None, None)
            .await?;

        info!(user_id = %user_id, amount, balance = event.balance_after, "Wallet deposit");
        self.publish(&event);
        Ok(event)
    }

    /// 提现（内部账务）
    pub async fn withdraw(&self, user_id: Uuid, amount: i64) -> Result<WalletEvent, LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::Validation(
                "withdrawal amount must be positive".to_string(),
            ));
        }

        let event = self
            .wallet_repo
            .debit(user_id, amount, WalletEventType::Withdrawal, None, None)
            .await?;

        info!(user_id = %user_id, amount, balance = event.balance_after, "Wallet withdrawal");
        self.publish(&event);
        Ok(event)
    }

    /// 余额投影
    pub async fn balance(&self, user_id: Uuid) -> Result<WalletBalance, LedgerError> {
        Ok(self.wallet_repo.get_or_init(user_id).await?)
    }

    /// 流水历史，旧事件在前
    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<u32>,
    ) -> Result<Vec<WalletEvent>, LedgerError> {
        Ok(self.wallet_repo.get_event_history(user_id, limit).await?)
    }

    fn publish(&self, event: &WalletEvent) {
        self.publisher.publish(DomainEvent::WalletMutated {
            user_id: event.user_id,
            event_type: event.event_type,
            amount: event.amount,
            balance_after: event.balance_after,
        });
    }
}
