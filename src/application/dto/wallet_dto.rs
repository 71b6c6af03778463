// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::wallet::{WalletBalance, WalletEvent, WalletEventType};

/// 充值/提现请求（内部账务）
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct WalletMutationRequestDto {
    /// 金额（最小货币单位）
    #[validate(range(min = 1))]
    pub amount: i64,
}

/// 钱包余额响应
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponseDto {
    pub user_id: Uuid,
    pub balance: i64,
    pub total_earned: i64,
    pub completed_tasks: i64,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<WalletBalance> for WalletResponseDto {
    fn from(wallet: WalletBalance) -> Self {
        Self {
            user_id: wallet.user_id,
            balance: wallet.balance,
            total_earned: wallet.total_earned,
            completed_tasks: wallet.completed_tasks,
            updated_at: wallet.updated_at,
        }
    }
}

/// 钱包流水事件视图
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletEventDto {
    pub id: Uuid,
    pub event_type: WalletEventType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub task_id: Option<Uuid>,
    pub escrow_id: Option<Uuid>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<WalletEvent> for WalletEventDto {
    fn from(event: WalletEvent) -> Self {
        Self {
            id: event.id,
            event_type: event.event_type,
            amount: event.amount,
            balance_before: event.balance_before,
            balance_after: event.balance_after,
            task_id: event.task_id,
            escrow_id: event.escrow_id,
            created_at: event.created_at,
        }
    }
}

/// 流水历史响应
#[derive(Debug, Serialize, Deserialize)]
pub struct WalletHistoryResponseDto {
    pub events: Vec<WalletEventDto>,
}
