// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::services::dispute_service::DisputeServiceError;
use crate::domain::services::idempotency_service::GuardError;
use crate::domain::services::ledger_service::LedgerError;
use crate::domain::services::rate_limit_service::RateLimitError;
use crate::domain::services::task_service::TaskFlowError;

/// 应用错误类型
///
/// 统一的错误分类与HTTP状态映射。竞态落败类错误
/// （already_assigned / already_resolved）有独立的错误码，
/// 调用方可以据此把它们当作良性空操作而不是系统故障。
#[derive(Debug)]
pub enum AppError {
    /// 非法状态转换
    InvalidState(String),
    /// 接受竞态落败
    AlreadyAssigned(String),
    /// 争议已被裁决
    AlreadyResolved(String),
    /// 幂等键载荷冲突
    Conflict(String),
    /// 余额不足
    InsufficientFunds { available: i64, required: i64 },
    /// 请求超出限流窗口
    RateLimited,
    /// 记录未找到
    NotFound(String),
    /// 调用方不是所需的角色或当事人
    Forbidden,
    /// 请求验证失败
    Validation(String),
    /// 存储或事务故障
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidState(_) => (StatusCode::CONFLICT, "invalid_state"),
            AppError::AlreadyAssigned(_) => (StatusCode::CONFLICT, "already_assigned"),
            AppError::AlreadyResolved(_) => (StatusCode::CONFLICT, "already_resolved"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "idempotency_conflict"),
            AppError::InsufficientFunds { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds")
            }
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::InvalidState(m)
            | AppError::AlreadyAssigned(m)
            | AppError::AlreadyResolved(m)
            | AppError::Conflict(m)
            | AppError::NotFound(m)
            | AppError::Validation(m) => m.clone(),
            AppError::InsufficientFunds {
                available,
                required,
            } => format!(
                "insufficient funds: available {}, required {}",
                available, required
            ),
            AppError::RateLimited => "too many requests".to_string(),
            AppError::Forbidden => "actor is not permitted to perform this action".to_string(),
            AppError::Internal(m) => {
                tracing::error!("Internal error surfaced to caller: {}", m);
                "internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = Json(json!({ "error": self.message(), "code": code }));
        (status, body).into_response()
    }
}

impl From<TaskFlowError> for AppError {
    fn from(err: TaskFlowError) -> Self {
        match err {
            TaskFlowError::InvalidState { .. } => AppError::InvalidState(err.to_string()),
            TaskFlowError::AlreadyAssigned(_) => AppError::AlreadyAssigned(err.to_string()),
            TaskFlowError::InsufficientFunds {
                available,
                required,
            } => AppError::InsufficientFunds {
                available,
                required,
            },
            TaskFlowError::NotFound(_) => AppError::NotFound(err.to_string()),
            TaskFlowError::Forbidden => AppError::Forbidden,
            TaskFlowError::Validation(_) => AppError::Validation(err.to_string()),
            TaskFlowError::Internal(m) => AppError::Internal(m),
        }
    }
}

impl From<DisputeServiceError> for AppError {
    fn from(err: DisputeServiceError) -> Self {
        match err {
            DisputeServiceError::AlreadyResolved(_) => AppError::AlreadyResolved(err.to_string()),
            DisputeServiceError::NotFound(_) => AppError::NotFound(err.to_string()),
            DisputeServiceError::Forbidden => AppError::Forbidden,
            DisputeServiceError::Validation(_) => AppError::Validation(err.to_string()),
            DisputeServiceError::Internal(m) => AppError::Internal(m),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds {
                available,
                required,
            } => AppError::InsufficientFunds {
                available,
                required,
            },
            LedgerError::Validation(_) => AppError::Validation(err.to_string()),
            LedgerError::Internal(m) => AppError::Internal(m),
        }
    }
}

impl From<GuardError> for AppError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::Conflict { .. } => AppError::Conflict(err.to_string()),
            GuardError::Storage(e) => AppError::Internal(e.to_string()),
        }
    }
}

impl From<RateLimitError> for AppError {
    fn from(err: RateLimitError) -> Self {
        AppError::Internal(err.to_string())
    }
}
