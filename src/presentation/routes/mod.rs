// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    routing::{get, post},
    Extension, Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::settings::Settings;
use crate::domain::services::dispute_service::DisputeResolver;
use crate::domain::services::fee_service::FeeService;
use crate::domain::services::ledger_service::LedgerService;
use crate::domain::services::task_service::TaskService;
use crate::presentation::handlers::{
    admin_handler, dispute_handler, fee_handler, metrics_handler, task_handler, wallet_handler,
};
use crate::presentation::middleware::auth_middleware::{auth_middleware, AuthState};
use crate::presentation::middleware::mutation_guard::{ApiIdempotencyGuard, ApiRateLimiter};

/// 路由装配所需的共享组件
#[derive(Clone)]
pub struct AppContext {
    pub db: Arc<DatabaseConnection>,
    pub settings: Arc<Settings>,
    pub task_service: Arc<TaskService>,
    pub ledger: Arc<LedgerService>,
    pub resolver: Arc<DisputeResolver>,
    pub fee_service: Arc<FeeService>,
    pub guard: Arc<ApiIdempotencyGuard>,
    pub limiter: Arc<ApiRateLimiter>,
}

/// 创建应用路由
///
/// 公共端点不经过认证；受保护端点先经过认证中间件，
/// 将解析出的请求主体注入请求扩展。
///
/// # 返回值
///
/// 返回配置好的路由
pub fn build_router(ctx: AppContext) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/v1/version", get(version))
        .route("/metrics", get(metrics_handler::metrics));

    let auth_state = AuthState {
        db: ctx.db.clone(),
    };

    let protected_routes = Router::new()
        .route("/v1/tasks", post(task_handler::create_task))
        .route("/v1/tasks", get(task_handler::list_tasks))
        .route("/v1/tasks/{id}", get(task_handler::get_task))
        .route("/v1/tasks/{id}/accept", post(task_handler::accept_task))
        .route("/v1/tasks/{id}/start", post(task_handler::start_task))
        .route("/v1/tasks/{id}/submit", post(task_handler::submit_task))
        .route("/v1/tasks/{id}/approve", post(task_handler::approve_task))
        .route("/v1/tasks/{id}/dispute", post(task_handler::dispute_task))
        .route("/v1/tasks/{id}/cancel", post(task_handler::cancel_task))
        .route("/v1/fees/preview", post(fee_handler::preview_fee))
        .route("/v1/wallet", get(wallet_handler::get_wallet))
        .route("/v1/wallet/events", get(wallet_handler::get_wallet_events))
        .route("/v1/wallet/deposit", post(wallet_handler::deposit))
        .route("/v1/wallet/withdraw", post(wallet_handler::withdraw))
        .route(
            "/v1/disputes/{id}/resolve",
            post(dispute_handler::resolve_dispute),
        )
        .route("/v1/disputes/{id}", get(dispute_handler::get_dispute))
        .route("/v1/disputes", get(dispute_handler::list_open_disputes))
        .route("/v1/admin/sweep", post(admin_handler::run_sweep))
        .route("/v1/admin/keys", post(admin_handler::create_api_key))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(Extension(ctx.db))
        .layer(Extension(ctx.settings))
        .layer(Extension(ctx.task_service))
        .layer(Extension(ctx.ledger))
        .layer(Extension(ctx.resolver))
        .layer(Extension(ctx.fee_service))
        .layer(Extension(ctx.guard))
        .layer(Extension(ctx.limiter))
        .layer(TraceLayer::new_for_http())
}

/// 健康检查端点
///
/// # 返回值
///
/// 返回"OK"字符串
pub async fn health_check() -> &'static str {
    "OK"
}

/// 版本信息端点
///
/// # 返回值
///
/// 返回应用版本号
pub async fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
