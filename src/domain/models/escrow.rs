// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 托管交易实体
///
/// 与已出资的任务一一对应。创建时冻结发布者的全额报酬，
/// 费用拆分在任务被接受时锁定（此时执行者档位才可知），
/// 锁定后满足 gross = platform_fee + net_payout 的不变量。
/// 结算状态单调，已结算的托管永不回退。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowTransaction {
    /// 托管交易唯一标识符
    pub id: Uuid,
    /// 关联的任务ID（一对一）
    pub task_id: Uuid,
    /// 发布者ID
    pub poster_id: Uuid,
    /// 执行者ID，接受时写入
    pub doer_id: Option<Uuid>,
    /// 总金额（最小货币单位）
    pub gross_amount: i64,
    /// 平台费，接受时锁定
    pub platform_fee: Option<i64>,
    /// 执行者净收入，恒等于 gross - fee
    pub net_payout: Option<i64>,
    /// 实际应用的费率（基点）
    pub applied_fee_bps: Option<i32>,
    /// 任务档位费率（基点）
    pub task_tier_fee_bps: Option<i32>,
    /// 金额档位费率（基点），低于门槛时为空
    pub value_tier_fee_bps: Option<i32>,
    /// 托管状态
    pub status: EscrowStatus,
    /// 自动放款时间，提交交付物时设置，争议时清除
    pub auto_release_at: Option<DateTime<FixedOffset>>,
    /// 结算时间
    pub released_at: Option<DateTime<FixedOffset>>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
}

/// 托管状态枚举
///
/// Held 为唯一的非终态；结算后状态不可回退。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EscrowStatus {
    /// 持有中，资金已冻结
    #[default]
    Held,
    /// 已放款给执行者
    Released,
    /// 已全额退款给发布者
    Refunded,
    /// 已按仲裁比例拆分
    Split,
}

impl EscrowStatus {
    /// 判断托管是否已结算（任何结算态都不可再变更）
    pub fn is_settled(&self) -> bool {
        !matches!(self, EscrowStatus::Held)
    }
}

impl fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EscrowStatus::Held => write!(f, "held"),
            EscrowStatus::Released => write!(f, "released"),
            EscrowStatus::Refunded => write!(f, "refunded"),
            EscrowStatus::Split => write!(f, "split"),
        }
    }
}

impl FromStr for EscrowStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "held" => Ok(EscrowStatus::Held),
            "released" => Ok(EscrowStatus::Released),
            "refunded" => Ok(EscrowStatus::Refunded),
            "split" => Ok(EscrowStatus::Split),
            _ => Err(()),
        }
    }
}

/// 费用拆分结果
///
/// 由费用引擎计算，接受任务时一次性写入托管并锁定。
/// 不变量：platform_fee + net_payout == gross_amount。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// 总金额
    pub gross_amount: i64,
    /// 任务档位费率（基点），由执行者的完成任务数决定
    pub task_tier_fee_bps: u32,
    /// 金额档位费率（基点），总金额低于门槛时为空
    pub value_tier_fee_bps: Option<u32>,
    /// 实际应用的费率，取两档中的较低者
    pub applied_fee_bps: u32,
    /// 平台费，四舍五入（half-up）
    pub platform_fee: i64,
    /// 执行者净收入
    pub net_payout: i64,
}

impl EscrowTransaction {
    /// 为新任务创建持有中的托管
    pub fn hold(task_id: Uuid, poster_id: Uuid, gross_amount: i64) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            id: Uuid::new_v4(),
            task_id,
            poster_id,
            doer_id: None,
            gross_amount,
            platform_fee: None,
            net_payout: None,
            applied_fee_bps: None,
            task_tier_fee_bps: None,
            value_tier_fee_bps: None,
            status: EscrowStatus::Held,
            auto_release_at: None,
            released_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
