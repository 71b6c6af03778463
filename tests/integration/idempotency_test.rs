// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::json;
use uuid::Uuid;

use escrowrs::domain::services::idempotency_service::{Admission, GuardError, IdempotencyGuard};

use super::helpers::TestContext;

#[tokio::test]
async fn test_fresh_key_admits_and_records_for_replay() {
    let ctx = TestContext::new().await;
    let caller = Uuid::new_v4();
    let body = json!({ "reward_amount": 50_000, "title": "Translate" });

    // 首次请求放行
    let admission = ctx
        .guard
        .admit("key-1", caller, "task:create", &body)
        .await
        .unwrap();
    assert_eq!(admission, Admission::Fresh);

    // 操作成功后记录响应
    let response = json!({ "id": "t-1", "status": "open" });
    ctx.guard
        .record("key-1", caller, "task:create", &body, 201, response.clone())
        .await
        .unwrap();

    // 同键同载荷重试：返回存储的原始响应
    match ctx
        .guard
        .admit("key-1", caller, "task:create", &body)
        .await
        .unwrap()
    {
        Admission::Replay {
            status,
            body: stored,
        } => {
            assert_eq!(status, 201);
            assert_eq!(stored, response);
        }
        Admission::Fresh => panic!("retry must replay, not re-execute"),
    }
}

#[tokio::test]
async fn test_same_key_different_payload_conflicts() {
    let ctx = TestContext::new().await;
    let caller = Uuid::new_v4();
    let body = json!({ "reward_amount": 50_000 });

    assert_eq!(
        ctx.guard
            .admit("key-1", caller, "task:create", &body)
            .await
            .unwrap(),
        Admission::Fresh
    );
    ctx.guard
        .record("key-1", caller, "task:create", &body, 201, json!({"id": 1}))
        .await
        .unwrap();

    // 同键不同载荷：冲突而非静默覆盖
    let other_body = json!({ "reward_amount": 99_999 });
    let err = ctx
        .guard
        .admit("key-1", caller, "task:create", &other_body)
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::Conflict { .. }));
}

#[tokio::test]
async fn test_key_scope_is_per_caller_and_endpoint() {
    let ctx = TestContext::new().await;
    let caller_a = Uuid::new_v4();
    let caller_b = Uuid::new_v4();
    let body = json!({ "amount": 10 });

    ctx.guard
        .record("shared-key", caller_a, "wallet:deposit", &body, 201, json!({}))
        .await
        .unwrap();

    // 不同调用方可以复用同一个键
    assert_eq!(
        ctx.guard
            .admit("shared-key", caller_b, "wallet:deposit", &body)
            .await
            .unwrap(),
        Admission::Fresh
    );

    // 同一调用方在不同端点复用键也不算冲突
    assert_eq!(
        ctx.guard
            .admit("shared-key", caller_a, "wallet:withdraw", &body)
            .await
            .unwrap(),
        Admission::Fresh
    );
}

#[tokio::test]
async fn test_failed_operation_does_not_poison_the_key() {
    let ctx = TestContext::new().await;
    let caller = Uuid::new_v4();
    let body = json!({ "reward_amount": 50_000 });

    // 放行后操作失败：不调用 record，键保持未用
    assert_eq!(
        ctx.guard
            .admit("retry-key", caller, "task:create", &body)
            .await
            .unwrap(),
        Admission::Fresh
    );

    // 带同一个键重试仍然放行
    assert_eq!(
        ctx.guard
            .admit("retry-key", caller, "task:create", &body)
            .await
            .unwrap(),
        Admission::Fresh
    );
}

#[tokio::test]
async fn test_record_race_with_identical_payload_resolves_as_replay() {
    let ctx = TestContext::new().await;
    let caller = Uuid::new_v4();
    let body = json!({ "amount": 10 });

    ctx.guard
        .record("race-key", caller, "wallet:deposit", &body, 201, json!({"id": 1}))
        .await
        .unwrap();

    // 竞态对方已写入同指纹的记录：record 按重放成功返回
    ctx.guard
        .record("race-key", caller, "wallet:deposit", &body, 201, json!({"id": 2}))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fingerprint_is_stable_for_identical_payloads() {
    let a = json!({ "b": 2, "a": 1 });
    let b = json!({ "a": 1, "b": 2 });

    // serde_json 的 Map 按键有序，字段顺序不影响指纹
    type Guard = IdempotencyGuard<
        escrowrs::infrastructure::repositories::idempotency_repo_impl::IdempotencyRepositoryImpl,
    >;
    assert_eq!(Guard::fingerprint(&a), Guard::fingerprint(&b));
}
