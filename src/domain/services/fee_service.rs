// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::models::escrow::FeeBreakdown;

/// 费率档位
///
/// upper_bound 为排他上界：计数或金额小于该值时命中此档。
/// None 表示开放档，必须是表中最后一档。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FeeTier {
    pub upper_bound: Option<i64>,
    pub fee_bps: u32,
}

/// 费率表配置
///
/// 两张单调不增的档位表：任务档按执行者的完成任务数取档，
/// 金额档在总金额达到门槛后按金额取档。引擎只要求表单调，
/// 具体档位属于配置而非引擎结构。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// 任务档位表，按完成任务数
    pub task_tiers: Vec<FeeTier>,
    /// 金额档位表，按总金额
    pub value_tiers: Vec<FeeTier>,
    /// 金额档生效门槛，低于此金额时金额档不参与
    pub value_tier_threshold: i64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            task_tiers: vec![
                FeeTier {
                    upper_bound: Some(12),
                    fee_bps: 2000,
                },
                FeeTier {
                    upper_bound: Some(50),
                    fee_bps: 1500,
                },
                FeeTier {
                    upper_bound: Some(200),
                    fee_bps: 1200,
                },
                FeeTier {
                    upper_bound: None,
                    fee_bps: 1000,
                },
            ],
            value_tiers: vec![
                FeeTier {
                    upper_bound: Some(100_000),
                    fee_bps: 1000,
                },
                FeeTier {
                    upper_bound: Some(500_000),
                    fee_bps: 800,
                },
                FeeTier {
                    upper_bound: None,
                    fee_bps: 600,
                },
            ],
            value_tier_threshold: 20_000,
        }
    }
}

/// 费用引擎错误类型
#[derive(Error, Debug)]
pub enum FeeError {
    #[error("Gross amount must be positive, got {0}")]
    NonPositiveAmount(i64),

    #[error("Invalid fee schedule: {0}")]
    InvalidSchedule(String),
}

/// 费用引擎
///
/// 纯函数式的费用计算：无IO、无副作用、完全确定。
/// 两档费率取较低者；平台费按 half-up 取整，净收入恒由
/// gross - fee 导出，避免各自取整产生的漂移。
#[derive(Debug, Clone)]
pub struct FeeService {
    schedule: FeeSchedule,
}

impl FeeService {
    /// 创建费用引擎，校验费率表
    ///
    /// # 返回值
    ///
    /// * `Ok(FeeService)` - 费率表合法
    /// * `Err(FeeError)` - 费率表为空、未以开放档收尾、或不单调
    pub fn new(schedule: FeeSchedule) -> Result<Self, FeeError> {
        Self::validate_tiers(&schedule.task_tiers, "task_tiers")?;
        Self::validate_tiers(&schedule.value_tiers, "value_tiers")?;
        Ok(Self { schedule })
    }

    fn validate_tiers(tiers: &[FeeTier], name: &str) -> Result<(), FeeError> {
        if tiers.is_empty() {
            return Err(FeeError::InvalidSchedule(format!("{} is empty", name)));
        }
        if tiers.last().map(|t| t.upper_bound.is_some()).unwrap_or(true) {
            return Err(FeeError::InvalidSchedule(format!(
                "{} must end with an open-ended tier",
                name
            )));
        }
        for pair in tiers.windows(2) {
            match (pair[0].upper_bound, pair[1].upper_bound) {
                (Some(a), Some(b)) if a >= b => {
                    return Err(FeeError::InvalidSchedule(format!(
                        "{} bounds must be strictly ascending",
                        name
                    )));
                }
                (None, _) => {
                    return Err(FeeError::InvalidSchedule(format!(
                        "{} open-ended tier must be last",
                        name
                    )));
                }
                _ => {}
            }
            if pair[1].fee_bps > pair[0].fee_bps {
                return Err(FeeError::InvalidSchedule(format!(
                    "{} rates must be monotonically non-increasing",
                    name
                )));
            }
        }
        Ok(())
    }

    /// 计算费用拆分
    ///
    /// # 参数
    ///
    /// * `gross_amount` - 总金额（最小货币单位），必须为正
    /// * `doer_completed_tasks` - 执行者已完成的任务数
    ///
    /// # 返回值
    ///
    /// * `Ok(FeeBreakdown)` - 满足 fee + net == gross 的拆分
    /// * `Err(FeeError)` - 金额不为正
    pub fn compute_fee(
        &self,
        gross_amount: i64,
        doer_completed_tasks: u64,
    ) -> Result<FeeBreakdown, FeeError> {
        if gross_amount <= 0 {
            return Err(FeeError::NonPositiveAmount(gross_amount));
        }

        let task_tier_fee_bps = Self::pick_tier(&self.schedule.task_tiers, doer_completed_tasks as i64);
        let value_tier_fee_bps = if gross_amount >= self.schedule.value_tier_threshold {
            Some(Self::pick_tier(&self.schedule.value_tiers, gross_amount))
        } else {
            None
        };

        // 付款方总是拿到两档中较低的费率，从不叠加
        let applied_fee_bps = match value_tier_fee_bps {
            Some(value_bps) => task_tier_fee_bps.min(value_bps),
            None => task_tier_fee_bps,
        };

        let platform_fee = Self::round_half_up(gross_amount, applied_fee_bps);
        let net_payout = gross_amount - platform_fee;

        Ok(FeeBreakdown {
            gross_amount,
            task_tier_fee_bps,
            value_tier_fee_bps,
            applied_fee_bps,
            platform_fee,
            net_payout,
        })
    }

    fn pick_tier(tiers: &[FeeTier], key: i64) -> u32 {
        for tier in tiers {
            match tier.upper_bound {
                Some(bound) if key < bound => return tier.fee_bps,
                Some(_) => continue,
                None => return tier.fee_bps,
            }
        }
        // validate_tiers 保证最后一档开放，走不到这里
        tiers.last().map(|t| t.fee_bps).unwrap_or(0)
    }

    // half-up: 0.5 进位。基点换算放大 10_000 倍后整数运算。
    fn round_half_up(gross: i64, bps: u32) -> i64 {
        ((gross as i128 * bps as i128 + 5_000) / 10_000) as i64
    }
}

#[cfg(test)]
#[path = "fee_service_test.rs"]
mod tests;
