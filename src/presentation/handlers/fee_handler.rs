// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{extract::Extension, Json};
use std::sync::Arc;
use validator::Validate;

use crate::application::dto::fee_preview::{FeePreviewRequestDto, FeePreviewResponseDto};
use crate::domain::services::fee_service::{FeeError, FeeService};
use crate::presentation::errors::AppError;

/// 费用预览
///
/// 只读的费用计算，看板在提交金额前调用。
/// 不产生任何副作用，也不经过幂等或限流守卫。
pub async fn preview_fee(
    Extension(fee_service): Extension<Arc<FeeService>>,
    Json(request): Json<FeePreviewRequestDto>,
) -> Result<Json<FeePreviewResponseDto>, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("validation error: {}", e)))?;

    let fee = fee_service
        .compute_fee(request.gross_amount, request.doer_completed_tasks)
        .map_err(|e| match e {
            FeeError::NonPositiveAmount(_) => AppError::Validation(e.to_string()),
            FeeError::InvalidSchedule(_) => AppError::Internal(e.to_string()),
        })?;

    Ok(Json(fee.into()))
}
