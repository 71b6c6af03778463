// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Duration, Utc};
use escrowrs::domain::models::task::{DomainError, Task, TaskStatus};
use uuid::Uuid;

fn future_deadline() -> chrono::DateTime<chrono::FixedOffset> {
    Utc::now().fixed_offset() + Duration::days(7)
}

#[test]
fn test_new_task_starts_open() {
    // Given: 新创建的任务
    let task = Task::new(
        Uuid::new_v4(),
        "Design a logo".to_string(),
        "Vector logo for a bakery".to_string(),
        25_000,
        future_deadline(),
    )
    .unwrap();

    assert_eq!(task.status, TaskStatus::Open);
    assert!(task.doer_id.is_none());
    assert!(task.review_deadline.is_none());
}

#[test]
fn test_new_task_rejects_bad_input() {
    let poster = Uuid::new_v4();

    // 金额必须为正
    assert!(matches!(
        Task::new(poster, "t".into(), "d".into(), 0, future_deadline()),
        Err(DomainError::ValidationError(_))
    ));

    // 截止时间必须在未来
    assert!(matches!(
        Task::new(
            poster,
            "t".into(),
            "d".into(),
            1_000,
            Utc::now().fixed_offset() - Duration::hours(1)
        ),
        Err(DomainError::ValidationError(_))
    ));
}

#[test]
fn test_transition_table_allows_the_documented_paths() {
    use TaskStatus::*;

    let allowed = [
        (Open, Accepted),
        (Open, Cancelled),
        (Accepted, InProgress),
        (Accepted, Cancelled),
        (InProgress, Submitted),
        (Submitted, Completed),
        (Submitted, Disputed),
        (Disputed, Completed),
        (Disputed, Cancelled),
    ];

    for (from, to) in allowed {
        assert!(from.can_transition(to), "{} -> {} should be legal", from, to);
    }
}

#[test]
fn test_transitions_not_in_the_table_are_rejected() {
    use TaskStatus::*;

    let all = [
        Open, Accepted, InProgress, Submitted, Disputed, Completed, Cancelled,
    ];
    let allowed = [
        (Open, Accepted),
        (Open, Cancelled),
        (Accepted, InProgress),
        (Accepted, Cancelled),
        (InProgress, Submitted),
        (Submitted, Completed),
        (Submitted, Disputed),
        (Disputed, Completed),
        (Disputed, Cancelled),
    ];

    for from in all {
        for to in all {
            let expected = allowed.contains(&(from, to));
            assert_eq!(
                from.can_transition(to),
                expected,
                "{} -> {} expected {}",
                from,
                to,
                expected
            );
        }
    }
}

#[test]
fn test_terminal_states_have_no_outgoing_transitions() {
    use TaskStatus::*;

    for terminal in [Completed, Cancelled] {
        assert!(terminal.is_terminal());
        for to in [Open, Accepted, InProgress, Submitted, Disputed, Completed, Cancelled] {
            assert!(!terminal.can_transition(to));
        }
    }
}

#[test]
fn test_ensure_transition_reports_the_attempted_pair() {
    let mut task = Task::new(
        Uuid::new_v4(),
        "t".into(),
        "d".into(),
        1_000,
        future_deadline(),
    )
    .unwrap();
    task.status = TaskStatus::InProgress;

    // submit 之前不能直接完成
    match task.ensure_transition(TaskStatus::Completed) {
        Err(DomainError::InvalidTransition { from, to }) => {
            assert_eq!(from, TaskStatus::InProgress);
            assert_eq!(to, TaskStatus::Completed);
        }
        other => panic!("expected InvalidTransition, got {:?}", other),
    }
}

#[test]
fn test_status_round_trips_through_strings() {
    use std::str::FromStr;
    use TaskStatus::*;

    for status in [Open, Accepted, InProgress, Submitted, Disputed, Completed, Cancelled] {
        let parsed = TaskStatus::from_str(&status.to_string()).unwrap();
        assert_eq!(parsed, status);
    }
    assert!(TaskStatus::from_str("nonsense").is_err());
}
