mod helpers;

use helpers::setup::{spawn_app, spawn_app_with_latency};
use helpers::utils::*;
use planner_notify_domain::{RecurringPattern, SendState};
use planner_notify_engine::{PassError, PassKind};
use planner_notify_infra::token_document_path;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn due_without_before_due_sends_due_reminder() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let task = create_personal_task(&test.ctx, &owner).await;
    let notification =
        create_notification(&test.ctx, &task.id, now - MINUTE, None, RecurringPattern::OneTime)
            .await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.ran_at, now);

    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::DueSent);
    let sent = test.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tokens, vec!["ann-device".to_string()]);
    assert_eq!(sent[0].message.title, "Task due");
    assert_eq!(sent[0].message.body, "Pay rent is due now");
    assert_eq!(sent[0].message.data["kind"], "due");
    assert_eq!(sent[0].message.data["notificationId"], notification.id.as_string());

    let doc = projection(
        &test.ctx,
        &format!("Notifications/ann@example.com/Tasks/{}", task.id),
    )
    .await;
    assert_eq!(doc, json!({ "isSend": 2, "isShow": true }));
}

#[tokio::test]
async fn before_due_reminder_goes_first_and_keeps_due_date() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let task = create_personal_task(&test.ctx, &owner).await;
    let notification = create_notification(
        &test.ctx,
        &task.id,
        now + HOUR,
        Some(now - MINUTE),
        RecurringPattern::OneTime,
    )
    .await;

    test.app.run_dispatch_pass().await.unwrap();
    let after_before_due = stored(&test.ctx, &notification).await;
    assert_eq!(after_before_due.is_send, SendState::BeforeDueSent);
    assert_eq!(after_before_due.due_date, notification.due_date);
    assert_eq!(test.push.sent()[0].message.title, "Upcoming task");
    assert_eq!(test.push.sent()[0].message.data["kind"], "beforeDue");

    // Nothing more until the due date
    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.total, 0);
    assert_eq!(test.push.sent().len(), 1);

    test.clock.set(now + HOUR);
    test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::DueSent);
    assert_eq!(test.push.sent().len(), 2);
    assert_eq!(test.push.sent()[1].message.title, "Task due");

    let doc = projection(
        &test.ctx,
        &format!("Notifications/ann@example.com/Tasks/{}", task.id),
    )
    .await;
    assert_eq!(
        doc,
        json!({ "isSend": 2, "isShow": true, "isNotiRemindShow": true })
    );
}

#[tokio::test]
async fn successful_ledger_write_prevents_resend() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let task = create_personal_task(&test.ctx, &owner).await;
    create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    for _ in 0..5 {
        test.app.run_dispatch_pass().await.unwrap();
    }
    assert_eq!(test.push.sent().len(), 1);
}

#[tokio::test]
async fn failed_ledger_write_resends_on_next_pass() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let task = create_personal_task(&test.ctx, &owner).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    test.ledger.fail_send_state_updates(true);
    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.error, 1);
    assert_eq!(test.push.sent().len(), 1);
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::Pending);

    test.ledger.fail_send_state_updates(false);
    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(test.push.sent().len(), 2);
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::DueSent);
}

#[tokio::test]
async fn board_without_members_notifies_only_its_creator() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let creator = create_user(&test.ctx, "creator@example.com", Some("creator-device")).await;
    let task = create_board_task(&test.ctx, &creator, &[]).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    test.app.run_dispatch_pass().await.unwrap();
    let sent = test.push.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].tokens, vec!["creator-device".to_string()]);

    let doc = projection(
        &test.ctx,
        &format!("BoardTasks/{}/Notifications/{}", task.id, notification.id),
    )
    .await;
    assert_eq!(doc["isSend"], json!(2));
    assert_eq!(doc["members"][creator.id.as_string()], json!({ "isShow": true }));
}

#[tokio::test]
async fn board_with_members_notifies_every_member() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let creator = create_user(&test.ctx, "creator@example.com", Some("creator-device")).await;
    let mut members = Vec::new();
    for i in 0..3 {
        let email = format!("member{}@example.com", i);
        let token = format!("member{}-device", i);
        members.push(create_user(&test.ctx, &email, Some(&token)).await);
    }
    let task = create_board_task(&test.ctx, &creator, &members).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.success, 1);

    let sent = test.push.sent();
    assert_eq!(sent.len(), 1);
    let mut tokens = sent[0].tokens.clone();
    tokens.sort();
    assert_eq!(
        tokens,
        vec![
            "member0-device".to_string(),
            "member1-device".to_string(),
            "member2-device".to_string()
        ]
    );

    let doc = projection(
        &test.ctx,
        &format!("BoardTasks/{}/Notifications/{}", task.id, notification.id),
    )
    .await;
    for member in &members {
        assert_eq!(doc["members"][member.id.as_string()], json!({ "isShow": true }));
    }
    assert!(doc["members"].get(creator.id.as_string()).is_none());
}

#[tokio::test]
async fn projection_failure_keeps_ledger_update() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let task = create_personal_task(&test.ctx, &owner).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    test.documents.set_fail_writes(true);
    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!((summary.success, summary.error), (1, 0));
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::DueSent);
}

#[tokio::test]
async fn one_failing_candidate_does_not_stop_the_others() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let with_token = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let without_token = create_user(&test.ctx, "bob@example.com", None).await;
    let task_a = create_personal_task(&test.ctx, &with_token).await;
    let task_b = create_personal_task(&test.ctx, &without_token).await;
    create_notification(&test.ctx, &task_a.id, now, None, RecurringPattern::OneTime).await;
    create_notification(&test.ctx, &task_b.id, now, None, RecurringPattern::OneTime).await;
    // Task that no longer exists
    create_notification(
        &test.ctx,
        &planner_notify_domain::ID::new(),
        now,
        None,
        RecurringPattern::OneTime,
    )
    .await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.success, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.error, 1);
}

#[tokio::test]
async fn worker_pool_bounds_concurrent_gateway_calls() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app_with_latency(now, Duration::from_millis(1));
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    for _ in 0..1000 {
        let task = create_personal_task(&test.ctx, &owner).await;
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;
    }

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.total, 1000);
    assert_eq!(summary.success, 1000);
    assert_eq!(test.push.sent().len(), 1000);
    assert!(test.push.peak_in_flight() <= 10);
    assert!(test.push.peak_in_flight() >= 1);
}

#[tokio::test]
async fn overlapping_dispatch_pass_is_skipped() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app_with_latency(now, Duration::from_millis(300));
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let task = create_personal_task(&test.ctx, &owner).await;
    create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let app = test.app.clone();
    let running = tokio::spawn(async move { app.run_dispatch_pass().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(
        test.app.run_dispatch_pass().await,
        Err(PassError::AlreadyRunning(PassKind::Dispatch))
    );
    // Recurrence passes are guarded separately
    assert!(test.app.run_recurrence_pass().await.is_ok());

    let summary = running.await.unwrap().unwrap();
    assert_eq!(summary.success, 1);
    assert!(test.app.run_dispatch_pass().await.is_ok());
}

#[tokio::test]
async fn hung_gateway_call_does_not_block_later_passes() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app_with_latency(now, Duration::from_secs(5))
        .with_candidate_timeout(Duration::from_millis(100));
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    let task = create_personal_task(&test.ctx, &owner).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!((summary.total, summary.success, summary.error), (1, 0, 1));
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::Pending);

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.error, 1);
    assert!(test.push.sent().is_empty());
}

#[tokio::test]
async fn unreadable_token_directory_counts_as_error() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    test.documents.fail_reads_of(&token_document_path(&owner.id));
    let task = create_personal_task(&test.ctx, &owner).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(
        (summary.total, summary.success, summary.error, summary.skipped),
        (1, 0, 1, 0)
    );
    assert!(test.push.sent().is_empty());
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::Pending);
}

#[tokio::test]
async fn unreadable_member_token_still_notifies_the_others() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let creator = create_user(&test.ctx, "creator@example.com", None).await;
    let readable = create_user(&test.ctx, "a@example.com", Some("a-device")).await;
    let unreadable = create_user(&test.ctx, "b@example.com", Some("b-device")).await;
    test.documents.fail_reads_of(&token_document_path(&unreadable.id));
    let task = create_board_task(&test.ctx, &creator, &[readable, unreadable]).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(summary.success, 1);
    assert_eq!(test.push.sent()[0].tokens, vec!["a-device".to_string()]);
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::DueSent);
}

#[tokio::test]
async fn every_target_rejected_leaves_ledger_unchanged() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let creator = create_user(&test.ctx, "creator@example.com", None).await;
    let a = create_user(&test.ctx, "a@example.com", Some("a-device")).await;
    let b = create_user(&test.ctx, "b@example.com", Some("b-device")).await;
    test.push.reject_token("a-device");
    test.push.reject_token("b-device");
    let task = create_board_task(&test.ctx, &creator, &[a, b]).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!((summary.success, summary.error), (0, 1));
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::Pending);
    let doc = projection(
        &test.ctx,
        &format!("BoardTasks/{}/Notifications/{}", task.id, notification.id),
    )
    .await;
    assert_eq!(doc, json!({}));
}

#[tokio::test]
async fn rejected_single_token_is_an_error() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let owner = create_user(&test.ctx, "ann@example.com", Some("ann-device")).await;
    test.push.reject_token("ann-device");
    let task = create_personal_task(&test.ctx, &owner).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!((summary.success, summary.error), (0, 1));
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::Pending);
}

#[tokio::test]
async fn partially_rejected_multicast_advances_ledger() {
    let now = ts(2024, 5, 1, 9, 0);
    let test = spawn_app(now);
    let creator = create_user(&test.ctx, "creator@example.com", None).await;
    let a = create_user(&test.ctx, "a@example.com", Some("a-device")).await;
    let b = create_user(&test.ctx, "b@example.com", Some("b-device")).await;
    test.push.reject_token("b-device");
    let task = create_board_task(&test.ctx, &creator, &[a, b]).await;
    let notification =
        create_notification(&test.ctx, &task.id, now, None, RecurringPattern::OneTime).await;

    let summary = test.app.run_dispatch_pass().await.unwrap();
    assert_eq!((summary.success, summary.error), (1, 0));
    assert_eq!(test.push.sent()[0].tokens, vec!["a-device".to_string()]);
    assert_eq!(stored(&test.ctx, &notification).await.is_send, SendState::DueSent);

    // Delivered once, the rejected target is not retried
    test.app.run_dispatch_pass().await.unwrap();
    assert_eq!(test.push.sent().len(), 1);
}
