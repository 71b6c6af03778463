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

use escrowrs::config::settings::Settings;
use escrowrs::domain::services::dispute_service::DisputeResolver;
use escrowrs::domain::services::fee_service::FeeService;
use escrowrs::domain::services::idempotency_service::IdempotencyGuard;
use escrowrs::domain::services::ledger_service::LedgerService;
use escrowrs::domain::services::rate_limit_service::SlidingWindowLimiter;
use escrowrs::domain::services::task_service::TaskService;
use escrowrs::infrastructure::database::connection;
use escrowrs::infrastructure::events::BroadcastEventBus;
use escrowrs::infrastructure::repositories::dispute_repo_impl::DisputeRepositoryImpl;
use escrowrs::infrastructure::repositories::escrow_repo_impl::EscrowRepositoryImpl;
use escrowrs::infrastructure::repositories::idempotency_repo_impl::IdempotencyRepositoryImpl;
use escrowrs::infrastructure::repositories::rate_limit_repo_impl::RateLimitRepositoryImpl;
use escrowrs::infrastructure::repositories::task_repo_impl::TaskRepositoryImpl;
use escrowrs::infrastructure::repositories::wallet_repo_impl::WalletRepositoryImpl;
use escrowrs::presentation::routes::{build_router, AppContext};
use escrowrs::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

use escrowrs::utils::telemetry;
use migration::{Migrator, MigratorTrait};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting escrowrs...");

    // Initialize Prometheus Metrics
    escrowrs::infrastructure::metrics::init_metrics();

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Connect to database
    let db = connection::create_pool(&settings.database).await?;
    let db = Arc::new(db);
    info!("Database connection established");

    // Run database migrations
    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize repositories
    let task_repo = Arc::new(TaskRepositoryImpl::new(db.clone()));
    let escrow_repo = Arc::new(EscrowRepositoryImpl::new(db.clone()));
    let wallet_repo = Arc::new(WalletRepositoryImpl::new(db.clone()));
    let dispute_repo = Arc::new(DisputeRepositoryImpl::new(db.clone()));
    let idempotency_repo = Arc::new(IdempotencyRepositoryImpl::new(db.clone()));
    let rate_limit_repo = Arc::new(RateLimitRepositoryImpl::new(db.clone()));

    // 5. Initialize services
    let event_bus = Arc::new(BroadcastEventBus::default());
    let fee_service = FeeService::new(settings.fees.clone())?;

    let task_service = Arc::new(TaskService::new(
        task_repo.clone(),
        escrow_repo.clone(),
        wallet_repo.clone(),
        fee_service.clone(),
        event_bus.clone(),
        chrono::Duration::hours(settings.escrow.review_window_hours),
    ));
    let ledger = Arc::new(LedgerService::new(wallet_repo.clone(), event_bus.clone()));
    let resolver = Arc::new(DisputeResolver::new(
        dispute_repo.clone(),
        escrow_repo.clone(),
        event_bus.clone(),
    ));
    let guard = Arc::new(IdempotencyGuard::new(idempotency_repo.clone()));
    let limiter = Arc::new(SlidingWindowLimiter::new(rate_limit_repo.clone()));
    info!("Services initialized");

    // 6. Start background workers
    let mut worker_manager = WorkerManager::new(
        task_service.clone(),
        limiter.clone(),
        Duration::from_secs(settings.escrow.sweep_interval_seconds),
    );
    worker_manager.start_workers();
    info!("Background workers started");

    // 7. Start HTTP server
    let app = build_router(AppContext {
        db: db.clone(),
        settings: settings.clone(),
        task_service,
        ledger,
        resolver,
        fee_service: Arc::new(fee_service),
        guard,
        limiter,
    });

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
