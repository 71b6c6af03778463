// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::principal::{Principal, Role};
use crate::infrastructure::database::entities::api_key;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sha2::{Digest, Sha256};

use std::sync::Arc;

/// 认证状态
#[derive(Clone)]
pub struct AuthState {
    /// 数据库连接
    pub db: Arc<DatabaseConnection>,
}

/// 计算API密钥摘要，服务端只存储与比对摘要
pub fn digest_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// 认证中间件
///
/// 把 Bearer API 密钥解析成请求主体（Principal）注入请求扩展。
/// 认证本身是外部协作者——状态机只消费解析出的主体与角色。
///
/// # 参数
///
/// * `state` - 认证状态
/// * `req` - HTTP请求
/// * `next` - 下一个中间件
///
/// # 返回值
///
/// * `Ok(Response)` - 认证成功的响应
/// * `Err(StatusCode)` - 认证失败的状态码
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = {
        let auth_header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|header| header.to_str().ok())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        if !auth_header.starts_with("Bearer ") {
            return Err(StatusCode::UNAUTHORIZED);
        }

        auth_header[7..].to_string()
    };

    let digest = digest_key(&token);

    match api_key::Entity::find()
        .filter(api_key::Column::KeyDigest.eq(digest))
        .one(state.db.as_ref())
        .await
    {
        Ok(Some(key)) => {
            let role: Role = key.role.parse().unwrap_or_default();
            req.extensions_mut()
                .insert(Principal::new(key.user_id, role));
            Ok(next.run(req).await)
        }
        Ok(None) => {
            tracing::warn!("Unknown API key presented");
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(e) => {
            tracing::error!("Database error checking API key: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
