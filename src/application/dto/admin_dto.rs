// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::models::principal::Role;

/// 签发API密钥请求
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateApiKeyRequestDto {
    /// 目标用户；缺省时为新用户生成ID
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub role: Role,
    #[validate(length(min = 1, max = 100))]
    pub label: String,
}

/// 签发API密钥响应
///
/// 明文密钥只在签发响应中出现一次，服务端仅存摘要。
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateApiKeyResponseDto {
    pub user_id: Uuid,
    pub role: Role,
    pub api_key: String,
}
