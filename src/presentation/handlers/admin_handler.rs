// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Extension, http::StatusCode, Json};
use chrono::Utc;
use rand::Rng;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::dto::admin_dto::{CreateApiKeyRequestDto, CreateApiKeyResponseDto};
use crate::application::dto::task_response::SweepResponseDto;
use crate::domain::models::principal::Principal;
use crate::domain::services::task_service::TaskService;
use crate::infrastructure::database::entities::api_key;
use crate::presentation::errors::AppError;
use crate::presentation::middleware::auth_middleware::digest_key;

/// 立即执行一次自动放款清扫（管理员/外部cron触发）
///
/// 清扫以系统权限运行，返回结构化的逐任务结果；
/// 与后台调度的清扫并发触发也是安全的。
pub async fn run_sweep(
    Extension(task_service): Extension<Arc<TaskService>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<SweepResponseDto>, AppError> {
    if !principal.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let report = task_service.sweep(Utc::now().fixed_offset()).await?;
    Ok(Json(report.into()))
}

/// 签发API密钥（仅管理员）
///
/// 明文密钥只在响应中出现一次，服务端存摘要。
pub async fn create_api_key(
    Extension(db): Extension<Arc<DatabaseConnection>>,
    Extension(principal): Extension<Principal>,
    Json(request): Json<CreateApiKeyRequestDto>,
) -> Result<(StatusCode, Json<CreateApiKeyResponseDto>), AppError> {
    if !principal.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    request
        .validate()
        .map_err(|e| AppError::Validation(format!("validation error: {}", e)))?;

    let user_id = request.user_id.unwrap_or_else(Uuid::new_v4);

    let raw: [u8; 32] = rand::rng().random();
    let api_key = format!("esk_{}", hex::encode(raw));

    let model = api_key::ActiveModel {
        id: Set(Uuid::new_v4()),
        key_digest: Set(digest_key(&api_key)),
        user_id: Set(user_id),
        role: Set(request.role.to_string()),
        label: Set(request.label),
        created_at: Set(Utc::now().fixed_offset()),
    };
    model
        .insert(db.as_ref())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApiKeyResponseDto {
            user_id,
            role: request.role,
            api_key,
        }),
    ))
}
