// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use uuid::Uuid;

use escrowrs::domain::models::principal::{Principal, Role};
use escrowrs::domain::models::wallet::WalletEventType;
use escrowrs::domain::repositories::wallet_repository::WalletRepository;
use escrowrs::domain::services::dispute_service::DisputeResolver;
use escrowrs::domain::services::event_publisher::NoopPublisher;
use escrowrs::domain::services::fee_service::{FeeSchedule, FeeService};
use escrowrs::domain::services::idempotency_service::IdempotencyGuard;
use escrowrs::domain::services::ledger_service::LedgerService;
use escrowrs::domain::services::rate_limit_service::SlidingWindowLimiter;
use escrowrs::domain::services::task_service::{CreateTaskCommand, TaskService, TaskWithEscrow};
use escrowrs::infrastructure::repositories::dispute_repo_impl::DisputeRepositoryImpl;
use escrowrs::infrastructure::repositories::escrow_repo_impl::EscrowRepositoryImpl;
use escrowrs::infrastructure::repositories::idempotency_repo_impl::IdempotencyRepositoryImpl;
use escrowrs::infrastructure::repositories::rate_limit_repo_impl::RateLimitRepositoryImpl;
use escrowrs::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use escrowrs::infrastructure::repositories::wallet_repo_impl::WalletRepositoryImpl;

/// 集成测试上下文
///
/// 基于单连接的内存SQLite搭建完整的服务栈。
pub struct TestContext {
    pub db: Arc<DatabaseConnection>,
    pub task_service: Arc<TaskService>,
    pub ledger: Arc<LedgerService>,
    pub resolver: Arc<DisputeResolver>,
    pub wallet_repo: Arc<WalletRepositoryImpl>,
    pub guard: Arc<IdempotencyGuard<IdempotencyRepositoryImpl>>,
    pub limiter: Arc<SlidingWindowLimiter<RateLimitRepositoryImpl>>,
}

impl TestContext {
    pub async fn new() -> Self {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1);
        let db = Arc::new(Database::connect(opt).await.unwrap());
        Migrator::up(db.as_ref(), None).await.unwrap();

        let task_repo = Arc::new(TaskRepositoryImpl::new(db.clone()));
        let escrow_repo = Arc::new(EscrowRepositoryImpl::new(db.clone()));
        let wallet_repo = Arc::new(WalletRepositoryImpl::new(db.clone()));
        let dispute_repo = Arc::new(DisputeRepositoryImpl::new(db.clone()));
        let publisher = Arc::new(NoopPublisher);

        let fee_service = FeeService::new(FeeSchedule::default()).unwrap();
        let task_service = Arc::new(TaskService::new(
            task_repo,
            escrow_repo.clone(),
            wallet_repo.clone(),
            fee_service,
            publisher.clone(),
            Duration::hours(24),
        ));
        let ledger = Arc::new(LedgerService::new(wallet_repo.clone(), publisher.clone()));
        let resolver = Arc::new(DisputeResolver::new(
            dispute_repo,
            escrow_repo,
            publisher,
        ));
        let guard = Arc::new(IdempotencyGuard::new(Arc::new(
            IdempotencyRepositoryImpl::new(db.clone()),
        )));
        let limiter = Arc::new(SlidingWindowLimiter::new(Arc::new(
            RateLimitRepositoryImpl::new(db.clone()),
        )));

        Self {
            db,
            task_service,
            ledger,
            resolver,
            wallet_repo,
            guard,
            limiter,
        }
    }

    /// 创建带初始余额的用户
    pub async fn funded_user(&self, amount: i64) -> Principal {
        let principal = Principal::new(Uuid::new_v4(), Role::User);
        self.wallet_repo
            .credit(
                principal.user_id,
                amount,
                WalletEventType::Deposit,
                None,
                None,
            )
            .await
            .unwrap();
        principal
    }

    pub fn admin(&self) -> Principal {
        Principal::new(Uuid::new_v4(), Role::Admin)
    }

    /// 创建一个标准任务（报酬50_000）
    pub async fn create_task(&self, poster: Principal) -> TaskWithEscrow {
        self.task_service
            .create(
                poster,
                CreateTaskCommand {
                    title: "Translate a document".to_string(),
                    description: "Translate ten pages into English".to_string(),
                    reward_amount: 50_000,
                    deadline: Utc::now().fixed_offset() + Duration::days(7),
                },
            )
            .await
            .unwrap()
    }

    /// 推进任务到 submitted（accept → start → submit）
    pub async fn advance_to_submitted(&self, task_id: Uuid, doer: Principal) {
        self.task_service.accept(task_id, doer).await.unwrap();
        self.task_service.start(task_id, doer).await.unwrap();
        self.task_service.submit(task_id, doer).await.unwrap();
    }
}
