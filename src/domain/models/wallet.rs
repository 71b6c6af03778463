// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    pub user_id: Uuid,
    pub balance: i64,
    pub total_earned: i64,
    pub completed_tasks: i64,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

/// 钱包流水事件
///
/// 仅追加的余额变动记录。amount 为有符号值（入账为正、
/// 出账为负），按写入顺序折叠所有事件必须能重建出当前余额，
/// 存储的余额只是该折叠的缓存。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_type: WalletEventType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub task_id: Option<Uuid>,
    pub escrow_id: Option<Uuid>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletEventType {
    Deposit,
    Withdrawal,
    EscrowFund,
    EscrowRelease,
    EscrowRefund,
    DisputePayout,
    Adjustment,
}

impl std::fmt::Display for WalletEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletEventType::Deposit => write!(f, "deposit"),
            WalletEventType::Withdrawal => write!(f, "withdrawal"),
            WalletEventType::EscrowFund => write!(f, "escrow_fund"),
            WalletEventType::EscrowRelease => write!(f, "escrow_release"),
            WalletEventType::EscrowRefund => write!(f, "escrow_refund"),
            WalletEventType::DisputePayout => write!(f, "dispute_payout"),
            WalletEventType::Adjustment => write!(f, "adjustment"),
        }
    }
}

impl std::str::FromStr for WalletEventType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(WalletEventType::Deposit),
            "withdrawal" => Ok(WalletEventType::Withdrawal),
            "escrow_fund" => Ok(WalletEventType::EscrowFund),
            "escrow_release" => Ok(WalletEventType::EscrowRelease),
            "escrow_refund" => Ok(WalletEventType::EscrowRefund),
            "dispute_payout" => Ok(WalletEventType::DisputePayout),
            "adjustment" => Ok(WalletEventType::Adjustment),
            _ => Err(()),
        }
    }
}
