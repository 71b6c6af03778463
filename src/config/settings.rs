// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::domain::services::fee_service::FeeSchedule;

/// 应用程序配置设置
///
/// 包含数据库、服务器、速率限制、幂等、托管与费率等所有配置项
#[derive(Debug, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 速率限制配置
    pub rate_limiting: RateLimitingSettings,
    /// 幂等配置
    pub idempotency: IdempotencySettings,
    /// 托管配置
    pub escrow: EscrowSettings,
    /// 费率表配置，缺省使用默认档位
    #[serde(default)]
    pub fees: FeeSchedule,
}

/// 数据库配置设置
#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 服务器配置设置
#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 速率限制配置设置
#[derive(Debug, Deserialize)]
pub struct RateLimitingSettings {
    /// 是否启用速率限制
    pub enabled: bool,
    /// 每个窗口允许的变更请求数
    pub max_requests: u32,
    /// 滑动窗口长度（分钟）
    pub window_minutes: i64,
}

/// 幂等配置设置
#[derive(Debug, Deserialize)]
pub struct IdempotencySettings {
    /// 资金变更请求缺失幂等键时是否视为配置错误并拒绝
    pub require_key: bool,
}

/// 托管配置设置
#[derive(Debug, Deserialize)]
pub struct EscrowSettings {
    /// 审核窗口时长（小时），提交后超时即自动放款
    pub review_window_hours: i64,
    /// 自动放款清扫间隔（秒）
    pub sweep_interval_seconds: u64,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 从环境变量加载配置，支持默认值
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Config::builder()
            // Start with default settings
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            // Default DB pool settings
            .set_default("database.url", "postgres://localhost/escrowrs")?
            .set_default("database.max_connections", 100)?
            .set_default("database.min_connections", 10)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            // Default Rate Limiting settings
            .set_default("rate_limiting.enabled", true)?
            .set_default("rate_limiting.max_requests", 60)?
            .set_default("rate_limiting.window_minutes", 1)?
            // Default Idempotency settings
            .set_default("idempotency.require_key", false)?
            // Default Escrow settings
            .set_default("escrow.review_window_hours", 24)?
            .set_default("escrow.sweep_interval_seconds", 120)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("ESCROWRS").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
#[path = "settings_test.rs"]
mod tests;
