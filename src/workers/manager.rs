// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::domain::services::task_service::TaskService;
use crate::presentation::middleware::mutation_guard::ApiRateLimiter;
use crate::workers::auto_release_worker::AutoReleaseWorker;

/// 工作管理器
///
/// 负责后台工作器的启动与优雅关闭：自动放款清扫工作器，
/// 以及限流记录的周期清理。
pub struct WorkerManager {
    task_service: Arc<TaskService>,
    limiter: Arc<ApiRateLimiter>,
    sweep_interval: Duration,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerManager {
    pub fn new(
        task_service: Arc<TaskService>,
        limiter: Arc<ApiRateLimiter>,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            task_service,
            limiter,
            sweep_interval,
            handles: Vec::new(),
        }
    }

    /// 启动后台工作器
    pub fn start_workers(&mut self) {
        let worker = AutoReleaseWorker::new(self.task_service.clone(), self.sweep_interval);
        self.handles.push(worker.start());

        // 限流记录按小时清理一次；窗口远小于保留期，purge 不影响计数
        let limiter = self.limiter.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match limiter.purge_expired(120).await {
                    Ok(purged) => {
                        if purged > 0 {
                            info!("Purged {} expired rate limit entries", purged);
                        }
                    }
                    Err(e) => {
                        error!("Failed to purge rate limit entries: {}", e);
                    }
                }
            }
        });
        self.handles.push(handle);
    }

    /// 等待关闭信号并关闭工作进程
    ///
    /// 监听关闭信号并优雅地关闭所有工作进程
    pub async fn wait_for_shutdown(&mut self) {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(err) => error!("Unable to listen for shutdown signal: {}", err),
        }

        info!("Shutting down workers...");
        for handle in &self.handles {
            handle.abort();
        }

        info!("Workers shut down successfully");
    }
}
