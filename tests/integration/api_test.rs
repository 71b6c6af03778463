// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum_test::TestServer;
use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use escrowrs::config::settings::{
    DatabaseSettings, EscrowSettings, IdempotencySettings, RateLimitingSettings, ServerSettings,
    Settings,
};
use escrowrs::domain::services::dispute_service::DisputeResolver;
use escrowrs::domain::services::event_publisher::EventPublisher;
use escrowrs::domain::services::fee_service::{FeeSchedule, FeeService};
use escrowrs::domain::services::idempotency_service::IdempotencyGuard;
use escrowrs::domain::services::ledger_service::LedgerService;
use escrowrs::domain::services::rate_limit_service::SlidingWindowLimiter;
use escrowrs::domain::services::task_service::TaskService;
use escrowrs::infrastructure::database::entities::api_key;
use escrowrs::infrastructure::events::BroadcastEventBus;
use escrowrs::infrastructure::repositories::dispute_repo_impl::DisputeRepositoryImpl;
use escrowrs::infrastructure::repositories::escrow_repo_impl::EscrowRepositoryImpl;
use escrowrs::infrastructure::repositories::idempotency_repo_impl::IdempotencyRepositoryImpl;
use escrowrs::infrastructure::repositories::rate_limit_repo_impl::RateLimitRepositoryImpl;
use escrowrs::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use escrowrs::infrastructure::repositories::wallet_repo_impl::WalletRepositoryImpl;
use escrowrs::presentation::middleware::auth_middleware::digest_key;
use escrowrs::presentation::routes::{build_router, AppContext};

/// HTTP级测试环境：完整路由栈 + 内存SQLite
struct ApiTestContext {
    server: TestServer,
    db: Arc<DatabaseConnection>,
}

impl ApiTestContext {
    async fn new(rate_limit_max: u32) -> Self {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1);
        let db = Arc::new(Database::connect(opt).await.unwrap());
        Migrator::up(db.as_ref(), None).await.unwrap();

        let settings = Arc::new(Settings {
            database: DatabaseSettings {
                url: "sqlite::memory:".to_string(),
                max_connections: Some(1),
                min_connections: None,
                connect_timeout: None,
                idle_timeout: None,
            },
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            rate_limiting: RateLimitingSettings {
                enabled: true,
                max_requests: rate_limit_max,
                window_minutes: 1,
            },
            idempotency: IdempotencySettings { require_key: false },
            escrow: EscrowSettings {
                review_window_hours: 24,
                sweep_interval_seconds: 120,
            },
            fees: FeeSchedule::default(),
        });

        let task_repo = Arc::new(TaskRepositoryImpl::new(db.clone()));
        let escrow_repo = Arc::new(EscrowRepositoryImpl::new(db.clone()));
        let wallet_repo = Arc::new(WalletRepositoryImpl::new(db.clone()));
        let dispute_repo = Arc::new(DisputeRepositoryImpl::new(db.clone()));
        let bus: Arc<dyn EventPublisher> = Arc::new(BroadcastEventBus::default());

        let fee_service = FeeService::new(settings.fees.clone()).unwrap();
        let task_service = Arc::new(TaskService::new(
            task_repo,
            escrow_repo.clone(),
            wallet_repo.clone(),
            fee_service.clone(),
            bus.clone(),
            Duration::hours(settings.escrow.review_window_hours),
        ));
        let ledger = Arc::new(LedgerService::new(wallet_repo, bus.clone()));
        let resolver = Arc::new(DisputeResolver::new(dispute_repo, escrow_repo, bus));
        let guard = Arc::new(IdempotencyGuard::new(Arc::new(
            IdempotencyRepositoryImpl::new(db.clone()),
        )));
        let limiter = Arc::new(SlidingWindowLimiter::new(Arc::new(
            RateLimitRepositoryImpl::new(db.clone()),
        )));

        let app = build_router(AppContext {
            db: db.clone(),
            settings,
            task_service,
            ledger,
            resolver,
            fee_service: Arc::new(fee_service),
            guard,
            limiter,
        });

        Self {
            server: TestServer::new(app).unwrap(),
            db,
        }
    }

    /// 直接落库签发API密钥，返回 (bearer token, user_id)
    async fn mint_key(&self, role: &str) -> (String, Uuid) {
        let user_id = Uuid::new_v4();
        let token = format!("esk_test_{}", Uuid::new_v4().simple());

        api_key::ActiveModel {
            id: Set(Uuid::new_v4()),
            key_digest: Set(digest_key(&token)),
            user_id: Set(user_id),
            role: Set(role.to_string()),
            label: Set("test key".to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(self.db.as_ref())
        .await
        .unwrap();

        (format!("Bearer {}", token), user_id)
    }

    async fn deposit(&self, bearer: &str, amount: i64) {
        let response = self
            .server
            .post("/v1/wallet/deposit")
            .add_header("Authorization", bearer)
            .json(&json!({ "amount": amount }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
    }
}

fn create_task_body() -> Value {
    json!({
        "title": "Translate a document",
        "description": "Ten pages, due next week",
        "reward_amount": 50_000,
        "deadline": (Utc::now() + chrono::Duration::days(7)).to_rfc3339(),
    })
}

#[tokio::test]
async fn test_public_endpoints_do_not_require_auth() {
    let ctx = ApiTestContext::new(100).await;

    let response = ctx.server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("OK");

    let response = ctx.server.get("/v1/version").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_protected_endpoints_reject_missing_or_unknown_keys() {
    let ctx = ApiTestContext::new(100).await;

    let response = ctx.server.get("/v1/wallet").await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

    let response = ctx
        .server
        .get("/v1/wallet")
        .add_header("Authorization", "Bearer esk_unknown")
        .await;
    response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_fee_preview_applies_the_lower_tier() {
    let ctx = ApiTestContext::new(100).await;
    let (bearer, _) = ctx.mint_key("user").await;

    let response = ctx
        .server
        .post("/v1/fees/preview")
        .add_header("Authorization", bearer.as_str())
        .json(&json!({ "gross_amount": 50_000, "doer_completed_tasks": 5 }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["task_tier_fee_bps"], 2000);
    assert_eq!(body["value_tier_fee_bps"], 1000);
    assert_eq!(body["applied_fee_bps"], 1000);
    assert_eq!(body["applied_fee_percent"], 10.0);
    assert_eq!(body["platform_fee"], 5_000);
    assert_eq!(body["net_payout"], 45_000);
}

#[tokio::test]
async fn test_idempotent_create_replays_the_exact_response() {
    let ctx = ApiTestContext::new(100).await;
    let (bearer, _) = ctx.mint_key("user").await;
    ctx.deposit(&bearer, 200_000).await;

    let body = create_task_body();

    let first = ctx
        .server
        .post("/v1/tasks")
        .add_header("Authorization", bearer.as_str())
        .add_header("Idempotency-Key", "create-1")
        .json(&body)
        .await;
    first.assert_status(axum::http::StatusCode::CREATED);
    let first_body: Value = first.json();

    // 同键同载荷重试：字节一致的响应，且只产生一次副作用
    let second = ctx
        .server
        .post("/v1/tasks")
        .add_header("Authorization", bearer.as_str())
        .add_header("Idempotency-Key", "create-1")
        .json(&body)
        .await;
    second.assert_status(axum::http::StatusCode::CREATED);
    let second_body: Value = second.json();
    assert_eq!(first_body, second_body);

    // 余额只被扣了一次
    let wallet = ctx
        .server
        .get("/v1/wallet")
        .add_header("Authorization", bearer.as_str())
        .await;
    let wallet_body: Value = wallet.json();
    assert_eq!(wallet_body["balance"], 150_000);
}

#[tokio::test]
async fn test_idempotency_conflict_on_payload_mismatch() {
    let ctx = ApiTestContext::new(100).await;
    let (bearer, _) = ctx.mint_key("user").await;
    ctx.deposit(&bearer, 200_000).await;

    let first = ctx
        .server
        .post("/v1/tasks")
        .add_header("Authorization", bearer.as_str())
        .add_header("Idempotency-Key", "create-2")
        .json(&create_task_body())
        .await;
    first.assert_status(axum::http::StatusCode::CREATED);

    let mut other = create_task_body();
    other["reward_amount"] = json!(60_000);

    let conflict = ctx
        .server
        .post("/v1/tasks")
        .add_header("Authorization", bearer.as_str())
        .add_header("Idempotency-Key", "create-2")
        .json(&other)
        .await;
    conflict.assert_status(axum::http::StatusCode::CONFLICT);
    let body: Value = conflict.json();
    assert_eq!(body["code"], "idempotency_conflict");

    // 冲突请求没有产生第二次扣款
    let wallet = ctx
        .server
        .get("/v1/wallet")
        .add_header("Authorization", bearer.as_str())
        .await;
    let wallet_body: Value = wallet.json();
    assert_eq!(wallet_body["balance"], 150_000);
}

#[tokio::test]
async fn test_full_lifecycle_over_http() {
    let ctx = ApiTestContext::new(100).await;
    let (poster, _) = ctx.mint_key("user").await;
    let (doer, _) = ctx.mint_key("user").await;
    ctx.deposit(&poster, 100_000).await;

    let created = ctx
        .server
        .post("/v1/tasks")
        .add_header("Authorization", poster.as_str())
        .json(&create_task_body())
        .await;
    created.assert_status(axum::http::StatusCode::CREATED);
    let task: Value = created.json();
    let task_id = task["id"].as_str().unwrap().to_string();

    for (actor, action) in [
        (&doer, "accept"),
        (&doer, "start"),
        (&doer, "submit"),
        (&poster, "approve"),
    ] {
        let response = ctx
            .server
            .post(&format!("/v1/tasks/{}/{}", task_id, action))
            .add_header("Authorization", actor.as_str())
            .await;
        response.assert_status_ok();
    }

    let doer_wallet = ctx
        .server
        .get("/v1/wallet")
        .add_header("Authorization", doer.as_str())
        .await;
    let wallet_body: Value = doer_wallet.json();
    assert_eq!(wallet_body["balance"], 45_000);
    assert_eq!(wallet_body["completed_tasks"], 1);
}

#[tokio::test]
async fn test_rate_limiter_denies_beyond_the_window() {
    let ctx = ApiTestContext::new(2).await;
    let (bearer, _) = ctx.mint_key("user").await;
    ctx.deposit(&bearer, 1_000_000).await;

    for _ in 0..2 {
        let response = ctx
            .server
            .post("/v1/tasks")
            .add_header("Authorization", bearer.as_str())
            .json(&create_task_body())
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
    }

    let denied = ctx
        .server
        .post("/v1/tasks")
        .add_header("Authorization", bearer.as_str())
        .json(&create_task_body())
        .await;
    denied.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
    let body: Value = denied.json();
    assert_eq!(body["code"], "rate_limited");
}

#[tokio::test]
async fn test_sweep_endpoint_requires_the_admin_role() {
    let ctx = ApiTestContext::new(100).await;
    let (user, _) = ctx.mint_key("user").await;
    let (admin, _) = ctx.mint_key("admin").await;

    let response = ctx
        .server
        .post("/v1/admin/sweep")
        .add_header("Authorization", user.as_str())
        .await;
    response.assert_status(axum::http::StatusCode::FORBIDDEN);

    let response = ctx
        .server
        .post("/v1/admin/sweep")
        .add_header("Authorization", admin.as_str())
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["processed"], 0);
}
