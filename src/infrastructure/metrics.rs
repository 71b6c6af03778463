// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// 初始化指标系统
///
/// 安装 Prometheus recorder 并注册业务指标。重复安装
/// （例如测试进程）只告警，不视为致命错误。
pub fn init_metrics() {
    let builder = PrometheusBuilder::new();
    match builder.install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}. A recorder may already be installed.", e);
        }
    }

    describe_counter!("tasks_created_total", "Total number of tasks created");
    describe_counter!(
        "task_transitions_total",
        "Total number of task state transitions, labelled by target state"
    );
    describe_counter!(
        "escrow_settlements_total",
        "Total number of escrow settlements, labelled by settlement status"
    );
    describe_counter!(
        "disputes_resolved_total",
        "Total number of resolved disputes, labelled by outcome"
    );
    describe_counter!(
        "auto_release_sweeps_total",
        "Total number of auto-release sweep runs"
    );
    describe_counter!(
        "rate_limited_requests_total",
        "Total number of requests denied by the rate limiter"
    );
    describe_histogram!(
        "sweep_batch_size",
        "Number of due tasks processed per auto-release sweep"
    );
}

/// 渲染当前指标快照，/metrics 端点使用
pub fn render() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
