// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::dispute::DisputeOutcome;
use crate::domain::models::escrow::EscrowStatus;
use crate::domain::models::task::TaskStatus;
use crate::domain::models::wallet::WalletEventType;

/// 领域事件
///
/// 状态机与账本在事务提交之后发布的事实通知。
/// 发布与事务写路径解耦，投递失败不影响已提交的变更。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskTransitioned {
        task_id: Uuid,
        from: TaskStatus,
        to: TaskStatus,
    },
    EscrowSettled {
        escrow_id: Uuid,
        task_id: Uuid,
        status: EscrowStatus,
    },
    WalletMutated {
        user_id: Uuid,
        event_type: WalletEventType,
        amount: i64,
        balance_after: i64,
    },
    DisputeResolved {
        dispute_id: Uuid,
        task_id: Uuid,
        outcome: DisputeOutcome,
    },
}

/// 事件发布接口
///
/// 消费端（通知分发、看板推送）不在本系统范围内，
/// 实现方只需保证 fire-and-forget 语义。
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: DomainEvent);
}

/// 丢弃所有事件的空实现，用于测试
#[derive(Debug, Default, Clone)]
pub struct NoopPublisher;

impl EventPublisher for NoopPublisher {
    fn publish(&self, _event: DomainEvent) {}
}
