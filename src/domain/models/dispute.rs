// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 争议实体
///
/// 由发布者或执行者在任务提交后发起，锁定托管，
/// 等待仲裁员给出裁决。已裁决的争议为终态，不可再次裁决。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispute {
    pub id: Uuid,
    pub task_id: Uuid,
    pub escrow_id: Uuid,
    /// 发起方（发布者或执行者）
    pub raised_by: Uuid,
    pub reason: String,
    pub status: DisputeStatus,
    pub outcome: Option<DisputeOutcome>,
    /// 裁决后执行者分得的金额
    pub doer_amount: Option<i64>,
    /// 裁决后发布者分得的金额
    pub poster_amount: Option<i64>,
    pub resolver_id: Option<Uuid>,
    pub resolved_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisputeStatus {
    /// 待裁决
    #[default]
    Open,
    /// 已裁决，终态
    Resolved,
}

impl fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisputeStatus::Open => write!(f, "open"),
            DisputeStatus::Resolved => write!(f, "resolved"),
        }
    }
}

impl FromStr for DisputeStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(DisputeStatus::Open),
            "resolved" => Ok(DisputeStatus::Resolved),
            _ => Err(()),
        }
    }
}

/// 仲裁结果
///
/// Approve 全额放款给执行者（平台照常收费），Reject 全额退款给
/// 发布者，Split 按基点比例拆分，余数分给发布者，两边之和
/// 恒等于总金额。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisputeOutcome {
    Approve,
    Reject,
    Split,
}

impl fmt::Display for DisputeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DisputeOutcome::Approve => write!(f, "approve"),
            DisputeOutcome::Reject => write!(f, "reject"),
            DisputeOutcome::Split => write!(f, "split"),
        }
    }
}

impl FromStr for DisputeOutcome {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(DisputeOutcome::Approve),
            "reject" => Ok(DisputeOutcome::Reject),
            "split" => Ok(DisputeOutcome::Split),
            _ => Err(()),
        }
    }
}

/// 裁决记录，作为裁决操作的返回结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub dispute_id: Uuid,
    pub task_id: Uuid,
    pub outcome: DisputeOutcome,
    pub doer_amount: i64,
    pub poster_amount: i64,
    pub resolver_id: Uuid,
    pub resolved_at: DateTime<FixedOffset>,
}

impl Dispute {
    /// 发起新争议
    pub fn raise(task_id: Uuid, escrow_id: Uuid, raised_by: Uuid, reason: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_id,
            escrow_id,
            raised_by,
            reason,
            status: DisputeStatus::Open,
            outcome: None,
            doer_amount: None,
            poster_amount: None,
            resolver_id: None,
            resolved_at: None,
            created_at: Utc::now().into(),
        }
    }
}
