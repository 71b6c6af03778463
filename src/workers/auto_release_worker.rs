// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::Utc;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::services::task_service::TaskService;

/// 自动放款工作器
///
/// 周期性扫描审核窗口已过期的已提交任务，代表系统驱动
/// 状态机的放款转换。与手动批准共用同一条放款路径，
/// 并发触发（调度重叠、外部cron）依赖放款的幂等语义，
/// 不需要外部锁。
pub struct AutoReleaseWorker {
    task_service: Arc<TaskService>,
    interval: Duration,
}

impl AutoReleaseWorker {
    pub fn new(task_service: Arc<TaskService>, interval: Duration) -> Self {
        Self {
            task_service,
            interval,
        }
    }

    /// 运行工作器
    pub async fn run(&self) {
        // 启动抖动，避免多实例同时起扫
        let jitter = rand::rng().random_range(0..=self.interval.as_millis().max(1) as u64 / 4);
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        info!(interval_secs = self.interval.as_secs(), "Auto-release worker started");

        let mut interval = tokio::time::interval(self.interval);

        loop {
            interval.tick().await;
            self.sweep_once().await;
        }
    }

    /// 执行一轮清扫
    pub async fn sweep_once(&self) {
        match self.task_service.sweep(Utc::now().fixed_offset()).await {
            Ok(report) => {
                metrics::histogram!("sweep_batch_size").record(report.processed as f64);
                if report.processed > 0 {
                    info!(
                        processed = report.processed,
                        released = report.released,
                        skipped = report.skipped,
                        failed = report.failed,
                        "Auto-release sweep completed"
                    );
                }
            }
            Err(e) => {
                error!("Auto-release sweep failed: {}", e);
            }
        }
    }

    /// 启动后台运行
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }
}

#[cfg(test)]
#[path = "auto_release_worker_test.rs"]
mod tests;
