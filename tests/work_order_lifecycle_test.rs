mod common;

use assert_matches::assert_matches;
use chrono::Duration;
use rust_decimal::Decimal;
use sea_orm::Iterable;

use maintops_api::{
    errors::ServiceError,
    models::{PriorityLabel, WorkOrderStatus},
    services::work_orders::CreateWorkOrder,
};

use common::*;

#[tokio::test]
async fn creation_assigns_sequential_monthly_numbers() {
    let ctx = setup().await;
    let first = create_order(&ctx, "Replace bearing").await;
    let second = create_order(&ctx, "Lubricate conveyor").await;

    assert_eq!(first.work_order_number, "WO-2026-08-0001");
    assert_eq!(second.work_order_number, "WO-2026-08-0002");
    assert_eq!(first.status, WorkOrderStatus::Requested);
    assert_eq!(first.version, 1);
}

#[tokio::test]
async fn creation_rejects_invalid_input() {
    let ctx = setup().await;
    let actor = admin();

    let mut blank = basic_request("   ");
    blank.title = "  ".to_string();
    assert_matches!(
        ctx.work_orders.create_work_order(blank, &actor).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut negative = basic_request("Negative estimate");
    negative.estimated_labor_cost = Some(Decimal::from(-5));
    assert_matches!(
        ctx.work_orders.create_work_order(negative, &actor).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut dangling = basic_request("Dangling relationship");
    dangling.relationship = Some(maintops_api::models::WorkOrderRelationship::Rework);
    assert_matches!(
        ctx.work_orders.create_work_order(dangling, &actor).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn transition_succeeds_exactly_when_the_table_allows_it() {
    let ctx = setup().await;
    let actor = admin();

    for from in WorkOrderStatus::iter() {
        for to in WorkOrderStatus::iter() {
            let order = create_order(&ctx, "Matrix probe").await;
            force_status(&ctx, order.id, from).await;

            let result = ctx.work_orders.transition(order.id, to, &actor, None).await;
            if from.can_transition_to(to) {
                let updated = result.unwrap_or_else(|e| panic!("{from} -> {to} failed: {e}"));
                assert_eq!(updated.status, to);
            } else {
                assert_matches!(
                    result,
                    Err(ServiceError::InvalidTransition { .. }),
                    "{from} -> {to} should be rejected"
                );
                // Rejection must leave the order untouched.
                let reread = fetch_order(&ctx, order.id).await;
                assert_eq!(reread.status, from);
                let history = ctx
                    .work_orders
                    .status_history(order.id)
                    .await
                    .expect("history");
                assert!(history.is_empty(), "failed transition must not log history");
            }
        }
    }
}

#[tokio::test]
async fn successful_transition_logs_history_and_stamps_actor() {
    let ctx = setup().await;
    let actor = admin();
    let order = create_order(&ctx, "Approve me").await;

    let updated = ctx
        .work_orders
        .transition(
            order.id,
            WorkOrderStatus::Approved,
            &actor,
            Some("routine approval".to_string()),
        )
        .await
        .expect("approve");

    assert_eq!(updated.status, WorkOrderStatus::Approved);
    assert_eq!(updated.approved_by, Some(actor.id));
    assert!(updated.approved_at.is_some());
    assert_eq!(updated.version, order.version + 1);

    let history = ctx
        .work_orders
        .status_history(order.id)
        .await
        .expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_status, WorkOrderStatus::Requested);
    assert_eq!(history[0].to_status, WorkOrderStatus::Approved);
    assert_eq!(history[0].actor_id, actor.id);
    assert_eq!(history[0].reason.as_deref(), Some("routine approval"));
}

#[tokio::test]
async fn estimates_always_sum_to_total() {
    let ctx = setup().await;
    let actor = admin();

    let mut req = basic_request("Costed job");
    req.estimated_parts_cost = Some(Decimal::from(100));
    req.estimated_labor_cost = Some(Decimal::from(50));
    let order = ctx
        .work_orders
        .create_work_order(req, &actor)
        .await
        .expect("create");
    assert_eq!(order.estimated_total_cost, Decimal::from(150));

    let updated = ctx
        .work_orders
        .update_estimates(order.id, None, None, Some(Decimal::from(70)))
        .await
        .expect("update estimates");
    assert_eq!(updated.estimated_parts_cost, Decimal::from(100));
    assert_eq!(updated.estimated_labor_cost, Decimal::from(70));
    assert_eq!(updated.estimated_total_cost, Decimal::from(170));
}

#[tokio::test]
async fn creation_stamps_come_from_the_injected_clock() {
    let ctx = setup().await;
    let order = create_order(&ctx, "Stamped job").await;

    // created_at feeds the age term of the score, so it must agree with the
    // clock the service was built with, not the machine clock.
    assert_eq!(order.created_at, base_time());
    assert_eq!(order.created_at, order.requested_at);
    assert_eq!(order.updated_at, base_time());
}

#[tokio::test]
async fn score_reflects_priority_age_and_overdue() {
    let ctx = setup().await;
    let actor = admin();

    let mut req = basic_request("Urgent and overdue");
    req.priority = Some(PriorityLabel::Urgent);
    req.due_date = Some(base_time() - Duration::days(2));
    let order = ctx
        .work_orders
        .create_work_order(req, &actor)
        .await
        .expect("create");

    // One day later the order is 1 day old and 3 days overdue:
    // 50 + 30 + 1 + 6 = 87.
    ctx.clock.advance(Duration::days(1));
    let score = ctx.work_orders.score(order.id).await.expect("score");
    assert_eq!(score, 87);
}

#[tokio::test]
async fn listing_filters_and_paginates() {
    let ctx = setup().await;
    for i in 0..3 {
        create_order(&ctx, &format!("Job {i}")).await;
    }
    let order = create_order(&ctx, "Approved job").await;
    ctx.work_orders
        .transition(order.id, WorkOrderStatus::Approved, &admin(), None)
        .await
        .expect("approve");

    let (approved, total) = ctx
        .work_orders
        .list_work_orders(
            maintops_api::services::work_orders::WorkOrderFilters {
                status: Some(WorkOrderStatus::Approved),
                ..Default::default()
            },
            1,
            10,
        )
        .await
        .expect("list");
    assert_eq!(total, 1);
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].id, order.id);

    let (page, total) = ctx
        .work_orders
        .list_work_orders(Default::default(), 1, 2)
        .await
        .expect("list all");
    assert_eq!(total, 4);
    assert_eq!(page.len(), 2);
}

#[tokio::test]
async fn type_defaults_fill_missing_priority_and_due_date() {
    use sea_orm::{ActiveModelTrait, ActiveValue::Set};

    let ctx = setup().await;
    let order_type = maintops_api::entities::work_order_type::ActiveModel {
        name: Set("Pump inspection".to_string()),
        category: Set(maintops_api::models::WorkOrderCategory::Inspection),
        default_priority: Set(PriorityLabel::High),
        requires_approval: Set(true),
        sla_hours: Set(Some(48)),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("seed type");

    let req = CreateWorkOrder {
        priority: None,
        due_date: None,
        type_id: Some(order_type.id),
        ..basic_request("Typed job")
    };
    let order = ctx
        .work_orders
        .create_work_order(req, &admin())
        .await
        .expect("create");

    assert_eq!(order.priority, PriorityLabel::High);
    assert_eq!(order.due_date, Some(base_time() + Duration::hours(48)));
}
