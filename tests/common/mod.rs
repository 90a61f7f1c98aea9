#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use tokio::sync::mpsc;
use uuid::Uuid;

use maintops_api::{
    auth::Actor,
    clock::FixedClock,
    db::{self, DbConfig, DbPool},
    entities::{checklist_item, technician, work_order},
    events::{process_events, EventSender},
    models::{PriorityLabel, WorkOrderCategory, WorkOrderSource, WorkOrderStatus},
    services::{
        work_orders::CreateWorkOrder, ExecutionService, PartReservationService, SchedulingService,
        WorkOrderService,
    },
};

pub struct TestCtx {
    pub db: Arc<DbPool>,
    pub clock: Arc<FixedClock>,
    pub work_orders: WorkOrderService,
    pub executions: ExecutionService,
    pub parts: PartReservationService,
    pub scheduling: SchedulingService,
}

/// Monday 2026-08-24 08:00 UTC; a weekday morning so capacity windows are
/// easy to reason about.
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 24, 8, 0, 0).unwrap()
}

pub async fn setup() -> TestCtx {
    // One pooled connection so the in-memory database is shared.
    let pool = db::establish_connection_with_config(&DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    })
    .await
    .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    let db = Arc::new(pool);
    let (tx, rx) = mpsc::channel(100);
    let sender = EventSender::new(tx);
    tokio::spawn(process_events(rx));

    let clock = Arc::new(FixedClock::new(base_time()));
    let clock_dyn: Arc<dyn maintops_api::clock::Clock> = clock.clone();

    TestCtx {
        work_orders: WorkOrderService::new(db.clone(), sender.clone(), clock_dyn.clone()),
        executions: ExecutionService::new(db.clone(), sender.clone(), clock_dyn.clone()),
        parts: PartReservationService::new(db.clone(), sender.clone(), clock_dyn.clone()),
        scheduling: SchedulingService::new(db.clone(), sender.clone(), clock_dyn),
        db,
        clock,
    }
}

pub fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), "test-admin", vec!["admin".to_string()])
}

pub fn basic_request(title: &str) -> CreateWorkOrder {
    CreateWorkOrder {
        title: title.to_string(),
        description: None,
        category: WorkOrderCategory::Corrective,
        type_id: None,
        priority: Some(PriorityLabel::Normal),
        due_date: None,
        estimated_hours: Some(Decimal::from(4)),
        estimated_parts_cost: None,
        estimated_labor_cost: None,
        source: WorkOrderSource::Manual,
        related_work_order_id: None,
        relationship: None,
    }
}

pub async fn create_order(ctx: &TestCtx, title: &str) -> work_order::Model {
    ctx.work_orders
        .create_work_order(basic_request(title), &admin())
        .await
        .expect("create work order")
}

/// Forces a status directly in storage, bypassing the transition table.
/// Test-only shortcut for placing an order in an arbitrary starting state.
pub async fn force_status(ctx: &TestCtx, order_id: Uuid, status: WorkOrderStatus) {
    let order = work_order::Entity::find_by_id(order_id)
        .one(ctx.db.as_ref())
        .await
        .expect("find")
        .expect("order exists");
    let mut am: work_order::ActiveModel = order.into();
    am.status = Set(status);
    am.update(ctx.db.as_ref()).await.expect("force status");
}

pub async fn fetch_order(ctx: &TestCtx, order_id: Uuid) -> work_order::Model {
    work_order::Entity::find_by_id(order_id)
        .one(ctx.db.as_ref())
        .await
        .expect("find")
        .expect("order exists")
}

pub async fn seed_technician(ctx: &TestCtx, capacity_hours: Decimal) -> technician::Model {
    technician::ActiveModel {
        name: Set("Dana Fieldtech".to_string()),
        daily_capacity_hours: Set(capacity_hours),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("seed technician")
}

pub async fn seed_checklist_item(
    ctx: &TestCtx,
    order_id: Uuid,
    label: &str,
    required: bool,
    position: i32,
) -> checklist_item::Model {
    checklist_item::ActiveModel {
        work_order_id: Set(order_id),
        label: Set(label.to_string()),
        required: Set(required),
        answered: Set(false),
        position: Set(position),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("seed checklist item")
}

/// Walks a fresh order to `scheduled` through the legal path and the
/// scheduling service, assigned to `technician_id` in `[start, end)`.
pub async fn schedule_order(
    ctx: &TestCtx,
    order_id: Uuid,
    technician_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> work_order::Model {
    let actor = admin();
    for target in [
        WorkOrderStatus::Approved,
        WorkOrderStatus::Planned,
        WorkOrderStatus::ReadyToSchedule,
    ] {
        ctx.work_orders
            .transition(order_id, target, &actor, None)
            .await
            .expect("walk to ready_to_schedule");
    }
    ctx.scheduling
        .schedule_one(order_id, start, end, Some(technician_id), None, &actor)
        .await
        .expect("schedule")
}
