// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, Utc};
use uuid::Uuid;

use escrowrs::domain::models::dispute::{DisputeOutcome, DisputeStatus};
use escrowrs::domain::models::escrow::EscrowStatus;
use escrowrs::domain::models::principal::{Principal, Role};
use escrowrs::domain::models::task::TaskStatus;
use escrowrs::domain::services::dispute_service::DisputeServiceError;
use escrowrs::domain::services::task_service::{CreateTaskCommand, TaskFlowError};

use super::helpers::TestContext;

/// 推进到争议状态，返回 (task_id, dispute_id)
async fn disputed_task(ctx: &TestContext, reward: i64) -> (Uuid, Uuid, Principal, Principal) {
    let poster = ctx.funded_user(reward * 2).await;
    let doer = ctx.funded_user(0).await;

    let view = ctx
        .task_service
        .create(
            poster,
            CreateTaskCommand {
                title: "Disputed work".to_string(),
                description: "Deliverable under question".to_string(),
                reward_amount: reward,
                deadline: Utc::now().fixed_offset() + Duration::days(7),
            },
        )
        .await
        .unwrap();
    let task_id = view.task.id;
    ctx.advance_to_submitted(task_id, doer).await;

    let dispute = ctx
        .task_service
        .dispute(task_id, poster, "Deliverable is incomplete".to_string())
        .await
        .unwrap();

    (task_id, dispute.id, poster, doer)
}

#[tokio::test]
async fn test_dispute_requires_a_party_and_a_submitted_task() {
    let ctx = TestContext::new().await;
    let poster = ctx.funded_user(100_000).await;
    let doer = ctx.funded_user(0).await;
    let stranger = Principal::new(Uuid::new_v4(), Role::User);

    let view = ctx.create_task(poster).await;
    let task_id = view.task.id;

    // submitted 之前不能发起争议
    let err = ctx
        .task_service
        .dispute(task_id, poster, "too early".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskFlowError::InvalidState { .. }));

    ctx.advance_to_submitted(task_id, doer).await;

    // 非当事人不能发起争议
    let err = ctx
        .task_service
        .dispute(task_id, stranger, "not my task".to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskFlowError::Forbidden));
}

#[tokio::test]
async fn test_resolve_approve_pays_the_doer_net_payout() {
    let ctx = TestContext::new().await;
    let (task_id, dispute_id, _poster, doer) = disputed_task(&ctx, 50_000).await;

    let record = ctx
        .resolver
        .resolve(dispute_id, DisputeOutcome::Approve, None, ctx.admin())
        .await
        .unwrap();

    // approve 沿用锁定的费用拆分：50_000 的 10% 档
    assert_eq!(record.doer_amount, 45_000);
    assert_eq!(record.poster_amount, 0);

    let view = ctx.task_service.fetch(task_id).await.unwrap();
    assert_eq!(view.task.status, TaskStatus::Completed);
    assert_eq!(view.escrow.status, EscrowStatus::Released);

    let doer_wallet = ctx.ledger.balance(doer.user_id).await.unwrap();
    assert_eq!(doer_wallet.balance, 45_000);
    assert_eq!(doer_wallet.completed_tasks, 1);
}

#[tokio::test]
async fn test_resolve_reject_refunds_the_poster_in_full() {
    let ctx = TestContext::new().await;
    let (task_id, dispute_id, poster, doer) = disputed_task(&ctx, 50_000).await;

    let record = ctx
        .resolver
        .resolve(dispute_id, DisputeOutcome::Reject, None, ctx.admin())
        .await
        .unwrap();

    assert_eq!(record.doer_amount, 0);
    assert_eq!(record.poster_amount, 50_000);

    let view = ctx.task_service.fetch(task_id).await.unwrap();
    assert_eq!(view.task.status, TaskStatus::Completed);
    assert_eq!(view.escrow.status, EscrowStatus::Refunded);

    let poster_wallet = ctx.ledger.balance(poster.user_id).await.unwrap();
    assert_eq!(poster_wallet.balance, 100_000);

    let doer_wallet = ctx.ledger.balance(doer.user_id).await.unwrap();
    assert_eq!(doer_wallet.balance, 0);
    assert_eq!(doer_wallet.completed_tasks, 0);
}

#[tokio::test]
async fn test_split_of_odd_gross_sums_exactly_with_remainder_to_poster() {
    let ctx = TestContext::new().await;
    let (task_id, dispute_id, poster, doer) = disputed_task(&ctx, 10_001).await;

    let record = ctx
        .resolver
        .resolve(dispute_id, DisputeOutcome::Split, Some(0.5), ctx.admin())
        .await
        .unwrap();

    // 10_001 按 0.5 拆分：执行者 5_000，余数分给发布者
    assert_eq!(record.doer_amount, 5_000);
    assert_eq!(record.poster_amount, 5_001);
    assert_eq!(record.doer_amount + record.poster_amount, 10_001);

    let view = ctx.task_service.fetch(task_id).await.unwrap();
    assert_eq!(view.task.status, TaskStatus::Completed);
    assert_eq!(view.escrow.status, EscrowStatus::Split);

    let poster_wallet = ctx.ledger.balance(poster.user_id).await.unwrap();
    // 初始 20_002，支出 10_001，收回 5_001
    assert_eq!(poster_wallet.balance, 15_002);

    let doer_wallet = ctx.ledger.balance(doer.user_id).await.unwrap();
    assert_eq!(doer_wallet.balance, 5_000);
}

#[tokio::test]
async fn test_split_requires_a_ratio_within_bounds() {
    let ctx = TestContext::new().await;
    let (_task_id, dispute_id, _poster, _doer) = disputed_task(&ctx, 10_000).await;

    let err = ctx
        .resolver
        .resolve(dispute_id, DisputeOutcome::Split, None, ctx.admin())
        .await
        .unwrap_err();
    assert!(matches!(err, DisputeServiceError::Validation(_)));

    let err = ctx
        .resolver
        .resolve(dispute_id, DisputeOutcome::Split, Some(1.5), ctx.admin())
        .await
        .unwrap_err();
    assert!(matches!(err, DisputeServiceError::Validation(_)));

    // 争议仍然待裁决
    let dispute = ctx.resolver.fetch(dispute_id).await.unwrap();
    assert_eq!(dispute.status, DisputeStatus::Open);
}

#[tokio::test]
async fn test_re_resolution_is_rejected() {
    let ctx = TestContext::new().await;
    let (_task_id, dispute_id, _poster, doer) = disputed_task(&ctx, 50_000).await;

    ctx.resolver
        .resolve(dispute_id, DisputeOutcome::Approve, None, ctx.admin())
        .await
        .unwrap();

    let err = ctx
        .resolver
        .resolve(dispute_id, DisputeOutcome::Reject, None, ctx.admin())
        .await
        .unwrap_err();
    assert!(matches!(err, DisputeServiceError::AlreadyResolved(id) if id == dispute_id));

    // 第二次裁决没有产生额外的资金变动
    let events = ctx.ledger.history(doer.user_id, None).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_only_admins_may_resolve() {
    let ctx = TestContext::new().await;
    let (_task_id, dispute_id, poster, _doer) = disputed_task(&ctx, 50_000).await;

    let err = ctx
        .resolver
        .resolve(dispute_id, DisputeOutcome::Approve, None, poster)
        .await
        .unwrap_err();
    assert!(matches!(err, DisputeServiceError::Forbidden));
}

#[tokio::test]
async fn test_open_disputes_are_listed_oldest_first() {
    let ctx = TestContext::new().await;
    let (_t1, d1, _p1, _) = disputed_task(&ctx, 10_000).await;
    let (_t2, d2, _p2, _) = disputed_task(&ctx, 10_000).await;

    let open = ctx.resolver.list_open(10).await.unwrap();
    assert_eq!(open.len(), 2);
    assert_eq!(open[0].id, d1);
    assert_eq!(open[1].id, d2);
}
