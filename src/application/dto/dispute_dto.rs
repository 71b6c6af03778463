// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::dispute::{Dispute, DisputeOutcome, DisputeStatus, ResolutionRecord};

/// 裁决请求数据传输对象
#[derive(Debug, Deserialize, Serialize)]
pub struct ResolveDisputeRequestDto {
    pub outcome: DisputeOutcome,
    /// split 时执行者的分成比例，[0, 1]
    pub doer_ratio: Option<f64>,
}

/// 争议视图
#[derive(Debug, Serialize, Deserialize)]
pub struct DisputeResponseDto {
    pub id: Uuid,
    pub task_id: Uuid,
    pub escrow_id: Uuid,
    pub raised_by: Uuid,
    pub reason: String,
    pub status: DisputeStatus,
    pub outcome: Option<DisputeOutcome>,
    pub doer_amount: Option<i64>,
    pub poster_amount: Option<i64>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<Dispute> for DisputeResponseDto {
    fn from(dispute: Dispute) -> Self {
        Self {
            id: dispute.id,
            task_id: dispute.task_id,
            escrow_id: dispute.escrow_id,
            raised_by: dispute.raised_by,
            reason: dispute.reason,
            status: dispute.status,
            outcome: dispute.outcome,
            doer_amount: dispute.doer_amount,
            poster_amount: dispute.poster_amount,
            created_at: dispute.created_at,
        }
    }
}

/// 裁决结果响应
#[derive(Debug, Serialize, Deserialize)]
pub struct ResolutionResponseDto {
    pub dispute_id: Uuid,
    pub task_id: Uuid,
    pub outcome: DisputeOutcome,
    pub doer_amount: i64,
    pub poster_amount: i64,
    pub resolved_at: DateTime<FixedOffset>,
}

impl From<ResolutionRecord> for ResolutionResponseDto {
    fn from(record: ResolutionRecord) -> Self {
        Self {
            dispute_id: record.dispute_id,
            task_id: record.task_id,
            outcome: record.outcome,
            doer_amount: record.doer_amount,
            poster_amount: record.poster_amount,
            resolved_at: record.resolved_at,
        }
    }
}
