// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::services::event_publisher::{DomainEvent, EventPublisher};

/// 进程内广播事件总线
///
/// 状态机与账本在事务提交之后把领域事件投递到广播通道，
/// 订阅方（通知分发、看板推送等外部协作者）各自消费。
/// 没有订阅者或订阅者落后导致的丢失只记录日志，
/// 不影响已提交的业务变更。
#[derive(Clone)]
pub struct BroadcastEventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// 订阅事件流
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventPublisher for BroadcastEventBus {
    fn publish(&self, event: DomainEvent) {
        // send 只在没有任何订阅者时失败，fire-and-forget
        if let Err(e) = self.sender.send(event) {
            debug!("No subscribers for domain event: {}", e);
        }
    }
}
