// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::{
    extract::{Extension, Query},
    http::{HeaderMap, StatusCode},
    response::Response,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

use crate::application::dto::wallet_dto::{
    WalletEventDto, WalletHistoryResponseDto, WalletMutationRequestDto, WalletResponseDto,
};
use crate::config::settings::Settings;
use crate::domain::models::principal::Principal;
use crate::domain::services::ledger_service::LedgerService;
use crate::presentation::errors::AppError;
use crate::presentation::middleware::mutation_guard::{
    admit, Admitted, ApiIdempotencyGuard, ApiRateLimiter,
};

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQueryDto {
    pub limit: Option<u32>,
}

/// 查询当前用户的钱包余额
pub async fn get_wallet(
    Extension(ledger): Extension<Arc<LedgerService>>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<WalletResponseDto>, AppError> {
    let wallet = ledger.balance(principal.user_id).await?;
    Ok(Json(wallet.into()))
}

/// 查询当前用户的流水历史（按写入顺序，旧事件在前）
pub async fn get_wallet_events(
    Extension(ledger): Extension<Arc<LedgerService>>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<HistoryQueryDto>,
) -> Result<Json<WalletHistoryResponseDto>, AppError> {
    let events = ledger
        .history(principal.user_id, query.limit.map(|l| l.min(1000)))
        .await?;

    Ok(Json(WalletHistoryResponseDto {
        events: events.into_iter().map(WalletEventDto::from).collect(),
    }))
}

/// 充值（内部账务入口，外部资金通道不在本系统范围内）
pub async fn deposit(
    Extension(ledger): Extension<Arc<LedgerService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(request): Json<WalletMutationRequestDto>,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("validation error: {}", e)))?;

    let body = json!({ "action": "deposit", "amount": request.amount });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "wallet:deposit",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let event = ledger.deposit(principal.user_id, request.amount).await?;
    let dto = WalletEventDto::from(event);
    ticket.commit(&guard, StatusCode::CREATED, &dto).await
}

/// 提现，余额不足时拒绝
pub async fn withdraw(
    Extension(ledger): Extension<Arc<LedgerService>>,
    Extension(guard): Extension<Arc<ApiIdempotencyGuard>>,
    Extension(limiter): Extension<Arc<ApiRateLimiter>>,
    Extension(settings): Extension<Arc<Settings>>,
    Extension(principal): Extension<Principal>,
    headers: HeaderMap,
    Json(request): Json<WalletMutationRequestDto>,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::Validation(format!("validation error: {}", e)))?;

    let body = json!({ "action": "withdraw", "amount": request.amount });
    let ticket = match admit(
        &guard,
        &limiter,
        &settings,
        principal,
        "wallet:withdraw",
        &headers,
        &body,
    )
    .await?
    {
        Admitted::Replay(response) => return Ok(response),
        Admitted::Execute(ticket) => ticket,
    };

    let event = ledger.withdraw(principal.user_id, request.amount).await?;
    let dto = WalletEventDto::from(event);
    ticket.commit(&guard, StatusCode::CREATED, &dto).await
}
