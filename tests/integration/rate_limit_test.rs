// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::{EntityTrait, PaginatorTrait};

use escrowrs::infrastructure::database::entities::rate_limit_entry;

use super::helpers::TestContext;

#[tokio::test]
async fn test_window_allows_up_to_the_limit_then_denies() {
    let ctx = TestContext::new().await;

    for expected_remaining in (0..3).rev() {
        let decision = ctx
            .limiter
            .try_acquire("user-1", "task:create", 3, 1)
            .await
            .unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, expected_remaining);
    }

    let denied = ctx
        .limiter
        .try_acquire("user-1", "task:create", 3, 1)
        .await
        .unwrap();
    assert!(!denied.allowed);
    assert_eq!(denied.remaining, 0);
}

#[tokio::test]
async fn test_denied_requests_write_no_records() {
    let ctx = TestContext::new().await;

    for _ in 0..2 {
        ctx.limiter
            .try_acquire("user-1", "task:accept", 2, 1)
            .await
            .unwrap();
    }

    // 超限后再试多次，全部拒绝
    for _ in 0..5 {
        let denied = ctx
            .limiter
            .try_acquire("user-1", "task:accept", 2, 1)
            .await
            .unwrap();
        assert!(!denied.allowed);
    }

    // 被拒请求不写记录，不占用未来窗口的配额
    let rows = rate_limit_entry::Entity::find()
        .count(ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(rows, 2);
}

#[tokio::test]
async fn test_windows_are_scoped_per_identifier_and_operation() {
    let ctx = TestContext::new().await;

    let d = ctx
        .limiter
        .try_acquire("user-1", "task:create", 1, 1)
        .await
        .unwrap();
    assert!(d.allowed);

    // 同一用户的另一操作有独立窗口
    let d = ctx
        .limiter
        .try_acquire("user-1", "task:cancel", 1, 1)
        .await
        .unwrap();
    assert!(d.allowed);

    // 另一个用户不受影响
    let d = ctx
        .limiter
        .try_acquire("user-2", "task:create", 1, 1)
        .await
        .unwrap();
    assert!(d.allowed);

    // 原窗口已满
    let d = ctx
        .limiter
        .try_acquire("user-1", "task:create", 1, 1)
        .await
        .unwrap();
    assert!(!d.allowed);
}

#[tokio::test]
async fn test_purge_removes_only_expired_entries() {
    let ctx = TestContext::new().await;

    ctx.limiter
        .try_acquire("user-1", "task:create", 10, 1)
        .await
        .unwrap();

    // 刚写入的记录不在清理范围内
    let purged = ctx.limiter.purge_expired(60).await.unwrap();
    assert_eq!(purged, 0);

    // 截止时间在未来：全部清理
    let purged = ctx.limiter.purge_expired(-1).await.unwrap();
    assert_eq!(purged, 1);
}
