// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use escrowrs::domain::models::wallet::WalletEventType;
use escrowrs::domain::services::ledger_service::LedgerError;
use escrowrs::domain::services::task_service::ReleaseResult;
use uuid::Uuid;

use super::helpers::TestContext;

/// 按写入顺序折叠流水必须重建出存储的余额
async fn assert_fold_invariant(ctx: &TestContext, user_id: Uuid) {
    let events = ctx.ledger.history(user_id, None).await.unwrap();
    let wallet = ctx.ledger.balance(user_id).await.unwrap();

    let mut folded = 0i64;
    for event in &events {
        assert_eq!(
            event.balance_before, folded,
            "event {} balance_before mismatch",
            event.id
        );
        folded += event.amount;
        assert_eq!(
            event.balance_after, folded,
            "event {} balance_after mismatch",
            event.id
        );
    }

    assert_eq!(
        folded, wallet.balance,
        "folding events must reproduce the stored balance"
    );
}

#[tokio::test]
async fn test_deposit_and_withdraw_round_trip() {
    let ctx = TestContext::new().await;
    let user = Uuid::new_v4();

    let event = ctx.ledger.deposit(user, 30_000).await.unwrap();
    assert_eq!(event.event_type, WalletEventType::Deposit);
    assert_eq!(event.balance_before, 0);
    assert_eq!(event.balance_after, 30_000);

    let event = ctx.ledger.withdraw(user, 12_000).await.unwrap();
    assert_eq!(event.event_type, WalletEventType::Withdrawal);
    assert_eq!(event.amount, -12_000);
    assert_eq!(event.balance_after, 18_000);

    assert_fold_invariant(&ctx, user).await;
}

#[tokio::test]
async fn test_overdraft_is_rejected_and_writes_nothing() {
    let ctx = TestContext::new().await;
    let user = Uuid::new_v4();

    ctx.ledger.deposit(user, 5_000).await.unwrap();

    let err = ctx.ledger.withdraw(user, 6_000).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerError::InsufficientFunds {
            available: 5_000,
            required: 6_000
        }
    ));

    // 失败的出账不产生流水
    let events = ctx.ledger.history(user, None).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_fold_invariant(&ctx, user).await;
}

#[tokio::test]
async fn test_non_positive_amounts_are_rejected() {
    let ctx = TestContext::new().await;
    let user = Uuid::new_v4();

    assert!(matches!(
        ctx.ledger.deposit(user, 0).await.unwrap_err(),
        LedgerError::Validation(_)
    ));
    assert!(matches!(
        ctx.ledger.withdraw(user, -5).await.unwrap_err(),
        LedgerError::Validation(_)
    ));
}

#[tokio::test]
async fn test_fold_invariant_holds_across_a_full_task_lifecycle() {
    let ctx = TestContext::new().await;
    let poster = ctx.funded_user(100_000).await;
    let doer = ctx.funded_user(0).await;

    // 完整生命周期：注资 → 接受 → 提交 → 放款
    let view = ctx.create_task(poster).await;
    let task_id = view.task.id;
    ctx.advance_to_submitted(task_id, doer).await;
    let result = ctx.task_service.release(task_id).await.unwrap();
    assert!(matches!(result, ReleaseResult::Released(_)));

    // 第二个任务走取消退款路径
    let view = ctx.create_task(poster).await;
    ctx.task_service
        .cancel(view.task.id, poster)
        .await
        .unwrap();

    assert_fold_invariant(&ctx, poster.user_id).await;
    assert_fold_invariant(&ctx, doer.user_id).await;

    // 发布者：+100_000 -50_000 -50_000 +50_000 = 50_000
    let poster_wallet = ctx.ledger.balance(poster.user_id).await.unwrap();
    assert_eq!(poster_wallet.balance, 50_000);

    // 执行者：+45_000（50_000 按 10% 档收费）
    let doer_wallet = ctx.ledger.balance(doer.user_id).await.unwrap();
    assert_eq!(doer_wallet.balance, 45_000);
    assert_eq!(doer_wallet.total_earned, 45_000);
}

#[tokio::test]
async fn test_escrow_fund_event_links_back_to_the_task() {
    let ctx = TestContext::new().await;
    let poster = ctx.funded_user(60_000).await;

    let view = ctx.create_task(poster).await;

    let events = ctx.ledger.history(poster.user_id, None).await.unwrap();
    let fund = events
        .iter()
        .find(|e| e.event_type == WalletEventType::EscrowFund)
        .expect("escrow fund event must exist");

    assert_eq!(fund.amount, -50_000);
    assert_eq!(fund.task_id, Some(view.task.id));
    assert_eq!(fund.escrow_id, Some(view.escrow.id));
}
