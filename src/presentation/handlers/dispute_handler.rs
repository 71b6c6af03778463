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
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dto::dispute_dto::{
    DisputeResponseDto, ResolutionResponseDto, ResolveDisputeRequestDto,
};
use crate::config::settings::Settings;
use crate::domain::models::principal::Principal;
use crate::domain::services::dispute_service::DisputeResolver;
use crate::presentation::errors::AppError;
use crate::presentation::middleware::mutation_guard::{
    admit, Admitted, ApiIdempotencyGuard, ApiRateLimiter,
};

#[derive(Debug, Default, Deserialize)]
pub struct OpenDisputesQueryDto {
    pub limit: Option<u32>,
}

/// 应用仲裁结论（仅管理员）
///
/// 裁决与资金结算在一个事务内完成；重复裁决拿到
/// already_resolved，属于竞态下的预期结果。
pub async fn resolve_dispute(
    Extension(resolver): Extension<Arc<DisputeResolver>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    Path(dispute_id): Path<Uuid>,
    headers: HeaderMap,
    Json(request): Json<ResolveDisputeRequestDto>,
) -> Result<Response, AppError> {
    let body = json!({
        "dispute_id": dispute_id,
        "outcome": request.outcome,
        "doer_ratio": request.doer_ratio,
    });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "dispute:resolve",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let record = resolver
        .resolve(dispute_id, request.outcome, request.doer_ratio, principal)
        .await?;

    let dto = ResolutionResponseDto::from(record);
    ticket.commit(&guard, StatusCode::OK, &dto).await
}

/// 查询争议详情（仅管理员）
pub async fn get_dispute(
    Extension(resolver): Extension<Arc<DisputeResolver>>,
    Extension(principal): Extension<Principal>,
    Path(dispute_id): Path<Uuid>,
) -> Result<Json<DisputeResponseDto>, AppError> {
    if !principal.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let dispute = resolver.fetch(dispute_id).await?;
    Ok(Json(dispute.into()))
}

/// 列出待裁决的争议（仅管理员），最早优先
pub async fn list_open_disputes(
    Extension(resolver): Extension<Arc<DisputeResolver>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<OpenDisputesQueryDto>,
) -> Result<Json<Vec<DisputeResponseDto>>, AppError> {
    if !principal.role.is_admin() {
        return Err(AppError::Forbidden);
    }

    let disputes = resolver
        .list_open(query.limit.unwrap_or(100).min(1000))
        .await?;

    Ok(Json(disputes.into_iter().map(Into::into).collect()))
}
