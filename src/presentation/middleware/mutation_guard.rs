// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::config::settings::Settings;
use crate::domain::models::principal::Principal;
use crate::domain::services::idempotency_service::{Admission, IdempotencyGuard};
use crate::domain::services::rate_limit_service::SlidingWindowLimiter;
use crate::infrastructure::repositories::idempotency_repo_impl::IdempotencyRepositoryImpl;
use crate::infrastructure::repositories::rate_limit_repo_impl::RateLimitRepositoryImpl;
use crate::presentation::errors::AppError;

pub type ApiIdempotencyGuard = IdempotencyGuard<IdempotencyRepositoryImpl>;
pub type ApiRateLimiter = SlidingWindowLimiter<RateLimitRepositoryImpl>;

/// 幂等键请求头
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// 变更请求的准入结果
pub enum Admitted {
    /// 同键同载荷的重试：直接返回存储的原始响应
    Replay(Response),
    /// 放行执行，携带提交所需的上下文
    Execute(MutationTicket),
}

/// 变更请求上下文
///
/// 变更操作的入口管线：幂等守卫 → 限流 → 状态机。
/// 操作成功后由 `commit` 记录响应并返回给调用方。
pub struct MutationTicket {
    key: Option<String>,
    caller: Principal,
    endpoint: &'static str,
    body: serde_json::Value,
}

/// 对一次变更请求执行守卫管线
///
/// 重放请求在限流之前就被放行返回，不消耗限流配额；
/// 全新请求先过幂等检查，再过滑动窗口限流。
/// 硬化部署（require_key）下缺失幂等键按配置错误拒绝。
pub async fn admit(
    guard: &ApiIdempotencyGuard,
    limiter: &ApiRateLimiter,
    settings: &Arc<Settings>,
    principal: Principal,
    endpoint: &'static str,
    headers: &HeaderMap,
    body: &serde_json::Value,
) -> Result<Admitted, AppError> {
    let key = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match &key {
        Some(k) => match guard.admit(k, principal.user_id, endpoint, body).await? {
            Admission::Fresh => {}
            Admission::Replay { status, body } => {
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::OK);
                return Ok(Admitted::Replay((status, Json(body)).into_response()));
            }
        },
        None if settings.idempotency.require_key => {
            return Err(AppError::Validation(format!(
                "{} header is required for financial mutations",
                IDEMPOTENCY_KEY_HEADER
            )));
        }
        None => {}
    }

    if settings.rate_limiting.enabled {
        let decision = limiter
            .try_acquire(
                &principal.user_id.to_string(),
                endpoint,
                settings.rate_limiting.max_requests,
                settings.rate_limiting.window_minutes,
            )
            .await?;

        if !decision.allowed {
            metrics::counter!("rate_limited_requests_total").increment(1);
            return Err(AppError::RateLimited);
        }
    }

    Ok(Admitted::Execute(MutationTicket {
        key,
        caller: principal,
        endpoint,
        body: body.clone(),
    }))
}

impl MutationTicket {
    /// 操作成功后提交：记录幂等响应并构造HTTP响应
    ///
    /// 只有走到这里的请求才会写幂等记录——失败的操作
    /// 不污染键，调用方可以带同一个键重试。
    pub async fn commit<T: Serialize>(
        self,
        guard: &ApiIdempotencyGuard,
        status: StatusCode,
        payload: &T,
    ) -> Result<Response, AppError> {
        let value =
            serde_json::to_value(payload).map_err(|e| AppError::Internal(e.to_string()))?;

        if let Some(key) = &self.key {
            guard
                .record(
                    key,
                    self.caller.user_id,
                    self.endpoint,
                    &self.body,
                    status.as_u16(),
                    value.clone(),
                )
                .await?;
        }

        Ok((status, Json(value)).into_response())
    }
}
