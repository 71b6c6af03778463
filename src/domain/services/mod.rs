// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 该模块包含系统的核心业务逻辑服务，这些服务封装了复杂的
/// 业务规则和领域逻辑，协调多个领域对象来完成业务操作。
///
/// 包含的服务：
/// - 费用引擎（fee_service）：纯函数式的平台费计算
/// - 任务服务（task_service）：任务/托管状态机，唯一的写路径
/// - 账本服务（ledger_service）：钱包余额与流水的外部入口
/// - 幂等守卫（idempotency_service）：变更请求的去重与重放
/// - 限流服务（rate_limit_service）：滑动窗口软限流
/// - 争议裁决（dispute_service）：仲裁结论的账务落地
/// - 事件发布（event_publisher）：提交后的领域事件通知
///
/// 领域服务与应用程序服务的区别在于：领域服务包含纯粹的业务逻辑，
/// 而应用程序服务负责协调和编排，可能包含技术实现细节。
pub mod dispute_service;
pub mod event_publisher;
pub mod fee_service;
pub mod idempotency_service;
pub mod ledger_service;
pub mod rate_limit_service;
pub mod task_service;
