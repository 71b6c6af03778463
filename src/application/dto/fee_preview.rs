// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::models::escrow::FeeBreakdown;

/// 费用预览请求，看板在提交金额前调用
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct FeePreviewRequestDto {
    /// 总金额（最小货币单位）
    #[validate(range(min = 1))]
    pub gross_amount: i64,
    /// 执行者已完成的任务数
    pub doer_completed_tasks: u64,
}

/// 费用预览响应
#[derive(Debug, Serialize, Deserialize)]
pub struct FeePreviewResponseDto {
    pub gross_amount: i64,
    pub task_tier_fee_bps: u32,
    pub value_tier_fee_bps: Option<u32>,
    pub applied_fee_bps: u32,
    /// 应用费率的百分比表示，方便看板直接展示
    pub applied_fee_percent: f64,
    pub platform_fee: i64,
    pub net_payout: i64,
}

impl From<FeeBreakdown> for FeePreviewResponseDto {
    fn from(fee: FeeBreakdown) -> Self {
        Self {
            gross_amount: fee.gross_amount,
            task_tier_fee_bps: fee.task_tier_fee_bps,
            value_tier_fee_bps: fee.value_tier_fee_bps,
            applied_fee_bps: fee.applied_fee_bps,
            applied_fee_percent: fee.applied_fee_bps as f64 / 100.0,
            platform_fee: fee.platform_fee,
            net_payout: fee.net_payout,
        }
    }
}
