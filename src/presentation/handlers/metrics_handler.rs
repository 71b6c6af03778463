// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::infrastructure::metrics;

/// Prometheus 指标端点
pub async fn metrics() -> String {
    metrics::render()
}
