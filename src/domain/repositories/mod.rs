// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 仓库接口定义了数据持久化的抽象契约，具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 任务仓库（task_repository）：任务的读取与查询
/// - 托管仓库（escrow_repository）：状态机的结算端口，所有
///   资金与状态的复合事务都在这里完成
/// - 钱包仓库（wallet_repository）：余额投影与流水事件
/// - 争议仓库（dispute_repository）：争议的读取
/// - 幂等仓库（idempotency_repository）：一次性写入的幂等记录
/// - 限流仓库（rate_limit_repository）：滑动窗口计数记录
///
/// 这些接口确保了领域层不依赖于具体的数据存储技术，
/// 提高了系统的可测试性和可维护性.
pub mod dispute_repository;
pub mod escrow_repository;
pub mod idempotency_repository;
pub mod rate_limit_repository;
pub mod task_repository;
pub mod wallet_repository;
