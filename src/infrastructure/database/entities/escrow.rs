// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "escrows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub task_id: Uuid,
    pub poster_id: Uuid,
    pub doer_id: Option<Uuid>,
    pub gross_amount: i64,
    pub platform_fee: Option<i64>,
    pub net_payout: Option<i64>,
    pub applied_fee_bps: Option<i32>,
    pub task_tier_fee_bps: Option<i32>,
    pub value_tier_fee_bps: Option<i32>,
    pub status: String,
    pub auto_release_at: Option<ChronoDateTimeWithTimeZone>,
    pub released_at: Option<ChronoDateTimeWithTimeZone>,
    pub created_at: ChronoDateTimeWithTimeZone,
    pub updated_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
