// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::domain::models::dispute::{Dispute, DisputeOutcome, DisputeStatus, ResolutionRecord};
use crate::domain::models::principal::Principal;
use crate::domain::repositories::dispute_repository::{
    DisputeRepository, DisputeRepositoryError,
};
use crate::domain::repositories::escrow_repository::{
    DisputeResolution, EscrowRepository, EscrowRepositoryError,
};
use crate::domain::services::event_publisher::{DomainEvent, EventPublisher};

/// 争议裁决错误类型
#[derive(Error, Debug)]
pub enum DisputeServiceError {
    /// 争议已被裁决，重复裁决被拒绝（竞态下的预期结果）
    #[error("Dispute {0} is already resolved")]
    AlreadyResolved(Uuid),

    #[error("Dispute not found: {0}")]
    NotFound(Uuid),

    #[error("Actor is not permitted to resolve disputes")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DisputeRepositoryError> for DisputeServiceError {
    fn from(err: DisputeRepositoryError) -> Self {
        DisputeServiceError::Internal(err.to_string())
    }
}

impl From<EscrowRepositoryError> for DisputeServiceError {
    fn from(err: EscrowRepositoryError) -> Self {
        DisputeServiceError::Internal(err.to_string())
    }
}

/// 争议裁决器
///
/// 把仲裁结论落到账上：全额放款、全额退款或按比例拆分。
/// 裁决与资金结算在同一个事务内完成，任务最终一律进入
/// completed。拆分金额用基点计算，余数归发布者，两边之和
/// 精确等于托管总额。
pub struct DisputeResolver {
    dispute_repo: Arc<dyn DisputeRepository>,
    escrow_repo: Arc<dyn EscrowRepository>,
    publisher: Arc<dyn EventPublisher>,
}

impl DisputeResolver {
    pub fn new(
        dispute_repo: Arc<dyn DisputeRepository>,
        escrow_repo: Arc<dyn EscrowRepository>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            dispute_repo,
            escrow_repo,
            publisher,
        }
    }

    /// 应用仲裁结论
    ///
    /// # 参数
    ///
    /// * `dispute_id` - 争议ID
    /// * `outcome` - 裁决结果（approve / reject / split）
    /// * `doer_ratio` - split 时执行者的分成比例，[0, 1]
    /// * `resolver` - 裁决人，必须具有管理员角色
    pub async fn resolve(
        &self,
        dispute_id: Uuid,
        outcome: DisputeOutcome,
        doer_ratio: Option<f64>,
        resolver: Principal,
    ) -> Result<ResolutionRecord, DisputeServiceError> {
        if !resolver.role.is_admin() {
            return Err(DisputeServiceError::Forbidden);
        }

        let dispute = self
            .dispute_repo
            .find_by_id(dispute_id)
            .await?
            .ok_or(DisputeServiceError::NotFound(dispute_id))?;

        if dispute.status == DisputeStatus::Resolved {
            return Err(DisputeServiceError::AlreadyResolved(dispute_id));
        }

        let (doer_amount, poster_amount) = self.settlement_amounts(&dispute, outcome, doer_ratio).await?;

        match self
            .escrow_repo
            .resolve_dispute(
                dispute_id,
                outcome,
                doer_amount,
                poster_amount,
                resolver.user_id,
            )
            .await?
        {
            DisputeResolution::Applied(record) => {
                metrics::counter!("disputes_resolved_total", "outcome" => outcome.to_string())
                    .increment(1);
                info!(
                    dispute_id = %dispute_id,
                    task_id = %record.task_id,
                    outcome = %outcome,
                    doer_amount,
                    poster_amount,
                    "Dispute resolved"
                );

                self.publisher.publish(DomainEvent::DisputeResolved {
                    dispute_id,
                    task_id: record.task_id,
                    outcome,
                });

                Ok(record)
            }
            DisputeResolution::AlreadyResolved => {
                Err(DisputeServiceError::AlreadyResolved(dispute_id))
            }
        }
    }

    /// 计算裁决的资金拆分
    ///
    /// approve 沿用锁定的费用拆分（平台照常收费）；reject 与
    /// split 不收费，全额在双方之间分配。
    async fn settlement_amounts(
        &self,
        dispute: &Dispute,
        outcome: DisputeOutcome,
        doer_ratio: Option<f64>,
    ) -> Result<(i64, i64), DisputeServiceError> {
        let escrow = self
            .escrow_repo
            .find_by_id(dispute.escrow_id)
            .await?
            .ok_or(DisputeServiceError::NotFound(dispute.escrow_id))?;

        match outcome {
            DisputeOutcome::Approve => {
                let net = escrow.net_payout.ok_or_else(|| {
                    DisputeServiceError::Internal(format!(
                        "escrow {} has no locked fee breakdown",
                        escrow.id
                    ))
                })?;
                Ok((net, 0))
            }
            DisputeOutcome::Reject => Ok((0, escrow.gross_amount)),
            DisputeOutcome::Split => {
                let ratio = doer_ratio.ok_or_else(|| {
                    DisputeServiceError::Validation(
                        "split outcome requires a doer ratio".to_string(),
                    )
                })?;
                if !(0.0..=1.0).contains(&ratio) {
                    return Err(DisputeServiceError::Validation(
                        "doer ratio must be within [0, 1]".to_string(),
                    ));
                }

                // 比例换算为基点后整数运算；余数归发布者
                let doer_bps = (ratio * 10_000.0).round() as i64;
                let doer_amount =
                    ((escrow.gross_amount as i128 * doer_bps as i128) / 10_000) as i64;
                let poster_amount = escrow.gross_amount - doer_amount;
                Ok((doer_amount, poster_amount))
            }
        }
    }

    /// 查询争议
    pub async fn fetch(&self, dispute_id: Uuid) -> Result<Dispute, DisputeServiceError> {
        self.dispute_repo
            .find_by_id(dispute_id)
            .await?
            .ok_or(DisputeServiceError::NotFound(dispute_id))
    }

    /// 列出待裁决的争议
    pub async fn list_open(&self, limit: u32) -> Result<Vec<Dispute>, DisputeServiceError> {
        Ok(self.dispute_repo.list_open(limit).await?)
    }
}
