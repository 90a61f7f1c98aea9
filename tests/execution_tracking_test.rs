mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use maintops_api::{
    errors::ServiceError,
    models::{ExecutionStatus, WorkOrderStatus},
    services::executions::CompleteExecution,
};

use common::*;

#[tokio::test]
async fn full_timing_round_trip_computes_actual_hours() {
    let ctx = setup().await;
    let actor = admin();
    let tech = seed_technician(&ctx, Decimal::from(8)).await;
    let order = create_order(&ctx, "Gearbox swap").await;
    schedule_order(
        &ctx,
        order.id,
        tech.id,
        base_time() + Duration::hours(1),
        base_time() + Duration::hours(4),
    )
    .await;

    // Start 08:00, pause 09:00-09:30, complete 10:45.
    let exec = ctx.executions.start(order.id, &actor).await.expect("start");
    assert_eq!(exec.status, ExecutionStatus::InProgress);
    assert_eq!(exec.technician_id, tech.id);
    let started = fetch_order(&ctx, order.id).await;
    assert_eq!(started.status, WorkOrderStatus::InProgress);
    assert_eq!(started.actual_start, Some(base_time()));

    ctx.clock.advance(Duration::hours(1));
    let paused = ctx.executions.pause(order.id).await.expect("pause");
    assert_eq!(paused.status, ExecutionStatus::Paused);

    ctx.clock.advance(Duration::minutes(30));
    let resumed = ctx.executions.resume(order.id).await.expect("resume");
    assert_eq!(resumed.status, ExecutionStatus::InProgress);
    assert_eq!(resumed.total_pause_minutes, 30);
    assert_eq!(resumed.paused_at, None);

    ctx.clock.advance(Duration::minutes(75));
    let completed = ctx
        .executions
        .complete(order.id, &actor, CompleteExecution::default())
        .await
        .expect("complete");
    assert_eq!(completed.status, ExecutionStatus::Completed);

    // 165 wall minutes minus 30 paused = 135 minutes = 2.25 hours.
    let done = fetch_order(&ctx, order.id).await;
    assert_eq!(done.status, WorkOrderStatus::Completed);
    assert_eq!(done.actual_hours, Some(dec!(2.25)));
    assert!(done.actual_end.is_some());
}

#[tokio::test]
async fn pause_and_resume_are_idempotent() {
    let ctx = setup().await;
    let actor = admin();
    let tech = seed_technician(&ctx, Decimal::from(8)).await;
    let order = create_order(&ctx, "Idempotent job").await;
    schedule_order(
        &ctx,
        order.id,
        tech.id,
        base_time(),
        base_time() + Duration::hours(2),
    )
    .await;
    ctx.executions.start(order.id, &actor).await.expect("start");

    // Resuming a running execution changes nothing.
    let noop = ctx.executions.resume(order.id).await.expect("resume noop");
    assert_eq!(noop.status, ExecutionStatus::InProgress);
    assert_eq!(noop.total_pause_minutes, 0);

    ctx.clock.advance(Duration::minutes(10));
    let first_pause = ctx.executions.pause(order.id).await.expect("pause");
    let second_pause = ctx.executions.pause(order.id).await.expect("pause again");
    assert_eq!(first_pause.paused_at, second_pause.paused_at);

    ctx.clock.advance(Duration::minutes(20));
    let resumed = ctx.executions.resume(order.id).await.expect("resume");
    assert_eq!(resumed.total_pause_minutes, 20);
    let again = ctx.executions.resume(order.id).await.expect("resume again");
    assert_eq!(again.total_pause_minutes, 20);
}

#[tokio::test]
async fn start_requires_a_scheduled_order_without_an_execution() {
    let ctx = setup().await;
    let actor = admin();
    let order = create_order(&ctx, "Not scheduled").await;

    assert_matches!(
        ctx.executions.start(order.id, &actor).await,
        Err(ServiceError::InvalidState(_))
    );

    let tech = seed_technician(&ctx, Decimal::from(8)).await;
    let scheduled = create_order(&ctx, "Scheduled").await;
    schedule_order(
        &ctx,
        scheduled.id,
        tech.id,
        base_time(),
        base_time() + Duration::hours(1),
    )
    .await;
    ctx.executions
        .start(scheduled.id, &actor)
        .await
        .expect("start");
    assert_matches!(
        ctx.executions.start(scheduled.id, &actor).await,
        Err(ServiceError::InvalidState(_))
    );
}

#[tokio::test]
async fn completion_is_gated_on_required_checklist_items() {
    let ctx = setup().await;
    let actor = admin();
    let tech = seed_technician(&ctx, Decimal::from(8)).await;
    let order = create_order(&ctx, "Checklisted job").await;

    let a = seed_checklist_item(&ctx, order.id, "Isolate power", true, 0).await;
    let b = seed_checklist_item(&ctx, order.id, "Verify lockout", true, 1).await;
    let c = seed_checklist_item(&ctx, order.id, "Test run", true, 2).await;
    seed_checklist_item(&ctx, order.id, "Optional photo", false, 3).await;

    schedule_order(
        &ctx,
        order.id,
        tech.id,
        base_time(),
        base_time() + Duration::hours(2),
    )
    .await;
    ctx.executions.start(order.id, &actor).await.expect("start");

    ctx.executions
        .answer_checklist_item(a.id, Some("done".to_string()))
        .await
        .expect("answer");
    ctx.executions
        .answer_checklist_item(b.id, Some("done".to_string()))
        .await
        .expect("answer");

    assert_matches!(
        ctx.executions
            .complete(order.id, &actor, CompleteExecution::default())
            .await,
        Err(ServiceError::IncompleteRequiredTasks {
            answered: 2,
            required: 3
        })
    );
    // 2 of 3 required answered, rounded to nearest.
    assert_eq!(
        ctx.executions
            .completion_percentage(order.id)
            .await
            .expect("pct"),
        67
    );

    ctx.executions
        .answer_checklist_item(c.id, None)
        .await
        .expect("answer");
    ctx.executions
        .complete(order.id, &actor, CompleteExecution::default())
        .await
        .expect("complete");
    assert_eq!(
        ctx.executions
            .completion_percentage(order.id)
            .await
            .expect("pct"),
        100
    );
}

#[tokio::test]
async fn completing_while_paused_folds_the_open_pause() {
    let ctx = setup().await;
    let actor = admin();
    let tech = seed_technician(&ctx, Decimal::from(8)).await;
    let order = create_order(&ctx, "Paused completion").await;
    schedule_order(
        &ctx,
        order.id,
        tech.id,
        base_time(),
        base_time() + Duration::hours(2),
    )
    .await;
    ctx.executions.start(order.id, &actor).await.expect("start");

    ctx.clock.advance(Duration::minutes(60));
    ctx.executions.pause(order.id).await.expect("pause");
    ctx.clock.advance(Duration::minutes(15));

    let completed = ctx
        .executions
        .complete(order.id, &actor, CompleteExecution::default())
        .await
        .expect("complete");
    assert_eq!(completed.total_pause_minutes, 15);

    // 75 wall minutes minus 15 paused = 1 hour of work.
    let order = fetch_order(&ctx, order.id).await;
    assert_eq!(order.actual_hours, Some(dec!(1.00)));
}

#[tokio::test]
async fn cancel_reverts_the_order_and_deletes_the_execution() {
    let ctx = setup().await;
    let actor = admin();
    let tech = seed_technician(&ctx, Decimal::from(8)).await;
    let order = create_order(&ctx, "Abandoned job").await;
    schedule_order(
        &ctx,
        order.id,
        tech.id,
        base_time(),
        base_time() + Duration::hours(2),
    )
    .await;
    ctx.executions.start(order.id, &actor).await.expect("start");
    ctx.clock.advance(Duration::minutes(20));

    let reverted = ctx
        .executions
        .cancel_execution(order.id, &actor, "part unavailable".to_string())
        .await
        .expect("cancel");
    assert_eq!(reverted.status, WorkOrderStatus::Approved);
    assert_eq!(reverted.actual_start, None);
    assert_eq!(reverted.actual_hours, None);

    assert!(ctx
        .executions
        .get_execution(order.id)
        .await
        .expect("get")
        .is_none());

    let history = ctx
        .work_orders
        .status_history(order.id)
        .await
        .expect("history");
    let last = history.last().expect("entries");
    assert_eq!(last.to_status, WorkOrderStatus::Approved);
    assert_eq!(last.reason.as_deref(), Some("part unavailable"));
}

#[tokio::test]
async fn duration_projection_tracks_the_running_clock() {
    let ctx = setup().await;
    let actor = admin();
    let tech = seed_technician(&ctx, Decimal::from(8)).await;
    let order = create_order(&ctx, "Running job").await;
    schedule_order(
        &ctx,
        order.id,
        tech.id,
        base_time(),
        base_time() + Duration::hours(2),
    )
    .await;
    ctx.executions.start(order.id, &actor).await.expect("start");

    ctx.clock.advance(Duration::minutes(45));
    assert_eq!(
        ctx.executions
            .actual_duration_minutes(order.id)
            .await
            .expect("duration"),
        45
    );

    ctx.executions.pause(order.id).await.expect("pause");
    ctx.clock.advance(Duration::minutes(30));
    // Paused time does not count as work.
    assert_eq!(
        ctx.executions
            .actual_duration_minutes(order.id)
            .await
            .expect("duration"),
        45
    );
}
