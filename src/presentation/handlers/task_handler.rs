// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::dispute_dto::DisputeResponseDto;
use crate::application::dto::task_request::{
    CreateTaskRequestDto, DisputeRequestDto, TaskListQueryDto,
};
use crate::application::dto::task_response::{
    ReleaseResponseDto, TaskListResponseDto, TaskResponseDto,
};
use crate::config::settings::Settings;
use crate::domain::models::principal::Principal;
use crate::domain::repositories::task_repository::TaskQueryParams;
use crate::domain::services::task_service::{CreateTaskCommand, ReleaseResult, TaskService};
use crate::presentation::errors::AppError;
use crate::presentation::middleware::mutation_guard::{
    admit, Admitted, ApiIdempotencyGuard, ApiRateLimiter,
};

/// 创建任务
///
/// 入口管线：幂等守卫 → 限流 → 状态机。创建会立即从
/// 发布者钱包划出全额报酬注入托管。
pub async fn create_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(request): Json<CreateTaskRequestDto>,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("validation error: {}", e)))?;

    let body = serde_json::to_value(&request).map_err(|e| AppError::Internal(e.to_string()))?;
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "task:create",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let view = task_service
        .create(
            principal,
            CreateTaskCommand {
                title: request.title,
                description: request.description,
                reward_amount: request.reward_amount,
                deadline: request.deadline,
            },
        )
        .await?;

    let dto = TaskResponseDto::from(view);
    ticket.commit(&guard, StatusCode::CREATED, &dto).await
}

/// 接受任务：open → accepted，锁定费用档位
pub async fn accept_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let body = json!({ "task_id": task_id, "action": "accept" });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "task:accept",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let view = task_service.accept(task_id, principal).await?;
    let dto = TaskResponseDto::from(view);
    ticket.commit(&guard, StatusCode::OK, &dto).await
}

/// 开始工作：accepted → in_progress
pub async fn start_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let body = json!({ "task_id": task_id, "action": "start" });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "task:start",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let view = task_service.start(task_id, principal).await?;
    let dto = TaskResponseDto::from(view);
    ticket.commit(&guard, StatusCode::OK, &dto).await
}

/// 提交交付物：in_progress → submitted，开启审核窗口
pub async fn submit_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let body = json!({ "task_id": task_id, "action": "submit" });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "task:submit",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let view = task_service.submit(task_id, principal).await?;
    let dto = TaskResponseDto::from(view);
    ticket.commit(&guard, StatusCode::OK, &dto).await
}

/// 发布者批准交付，走共用的放款路径
///
/// 与自动放款清扫竞态时，落败方拿到 already_released 的
/// 良性结果而不是错误。
pub async fn approve_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let body = json!({ "task_id": task_id, "action": "approve" });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "task:approve",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let dto = match task_service.approve(task_id, principal).await? {
        ReleaseResult::Released(view) => ReleaseResponseDto::Released {
            task: Box::new(TaskResponseDto::from(view)),
        },
        ReleaseResult::AlreadyReleased => ReleaseResponseDto::AlreadyReleased,
    };
    ticket.commit(&guard, StatusCode::OK, &dto).await
}

/// 发起争议：submitted → disputed，锁定托管
pub async fn dispute_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<DisputeRequestDto>,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("validation error: {}", e)))?;

    let body = json!({ "task_id": task_id, "action": "dispute", "reason": request.reason });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "task:dispute",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let dispute = task_service
        .dispute(task_id, principal, request.reason)
        .await?;
    let dto = DisputeResponseDto::from(dispute);
    ticket.commit(&guard, StatusCode::CREATED, &dto).await
}

/// 取消任务并退款：仅限发布者、仅限 open/accepted
pub async fn cancel_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let body = json!({ "task_id": task_id, "action": "cancel" });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "task:cancel",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let view = task_service.cancel(task_id, principal).await?;
    let dto = TaskResponseDto::from(view);
    ticket.commit(&guard, StatusCode::OK, &dto).await
}

/// 查询单个任务（参与者或管理员）
pub async fn get_task(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(principal): Extension<Principal>,
    Path(task_id): Path<Uuid>,
) -> Result<Json<TaskResponseDto>, AppError> {
    let view = task_service.fetch(task_id).await?;

    let is_participant = view.task.poster_id == principal.user_id
        || view.task.doer_id == Some(principal.user_id);
    if !is_participant && !principal.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    Ok(Json(TaskResponseDto::from(view)))
}

/// 查询当前用户参与的任务列表
pub async fn list_tasks(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<TaskListQueryDto>,
) -> Result<Json<TaskListResponseDto>, AppError> {
    let (tasks, total) = task_service
        .query(TaskQueryParams {
            participant: Some(principal.user_id),
            statuses: query.status.map(|s| vec![s]),
            limit: query.limit.unwrap_or(100).min(1000),
            offset: query.offset.unwrap_or(0),
            ..Default::default()
        })
        .await?;

    Ok(Json(TaskListResponseDto {
        tasks: tasks.into_iter().map(Into::into).collect(),
        total,
    }))
}
