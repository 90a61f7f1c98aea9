mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use maintops_api::{
    errors::ServiceError,
    models::PartReservationStatus,
    services::parts::PlannedLine,
};

use common::*;

fn line(part_id: Uuid, name: &str, qty: Decimal, unit_cost: Decimal) -> PlannedLine {
    PlannedLine {
        part_id,
        part_name: name.to_string(),
        estimated_quantity: qty,
        unit_cost,
    }
}

#[tokio::test]
async fn planning_rolls_the_parts_estimate_up_to_the_order() {
    let ctx = setup().await;
    let order = create_order(&ctx, "Parts job").await;

    let bearing = Uuid::new_v4();
    let seal = Uuid::new_v4();
    let lines = ctx
        .parts
        .replace_planned_lines(
            order.id,
            vec![
                line(bearing, "Bearing 6204", dec!(2), dec!(15)),
                line(seal, "Shaft seal", dec!(4), dec!(2.50)),
            ],
        )
        .await
        .expect("plan lines");

    assert_eq!(lines.len(), 2);
    let updated = fetch_order(&ctx, order.id).await;
    // 2 * 15 + 4 * 2.50 = 40.
    assert_eq!(updated.estimated_parts_cost, dec!(40));
    assert_eq!(
        updated.estimated_total_cost,
        dec!(40) + updated.estimated_labor_cost
    );
}

#[tokio::test]
async fn replanning_updates_in_place_and_drops_missing_planned_lines() {
    let ctx = setup().await;
    let order = create_order(&ctx, "Replanned job").await;
    let bearing = Uuid::new_v4();
    let seal = Uuid::new_v4();
    let grease = Uuid::new_v4();

    ctx.parts
        .replace_planned_lines(
            order.id,
            vec![
                line(bearing, "Bearing 6204", dec!(2), dec!(15)),
                line(seal, "Shaft seal", dec!(4), dec!(2.50)),
            ],
        )
        .await
        .expect("plan");

    // Bearing quantity changes, seal disappears, grease appears.
    let lines = ctx
        .parts
        .replace_planned_lines(
            order.id,
            vec![
                line(bearing, "Bearing 6204", dec!(3), dec!(15)),
                line(grease, "Grease cartridge", dec!(1), dec!(8)),
            ],
        )
        .await
        .expect("replan");

    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| l.part_id != seal));
    let bearing_line = lines.iter().find(|l| l.part_id == bearing).expect("bearing");
    assert_eq!(bearing_line.estimated_quantity, dec!(3));

    let updated = fetch_order(&ctx, order.id).await;
    assert_eq!(updated.estimated_parts_cost, dec!(53));
}

#[tokio::test]
async fn replanning_leaves_in_flight_lines_untouched() {
    let ctx = setup().await;
    let actor = admin();
    let order = create_order(&ctx, "In-flight parts").await;
    let bearing = Uuid::new_v4();

    let lines = ctx
        .parts
        .replace_planned_lines(order.id, vec![line(bearing, "Bearing", dec!(2), dec!(15))])
        .await
        .expect("plan");
    ctx.parts
        .reserve(lines[0].id, dec!(2), &actor)
        .await
        .expect("reserve");

    // The reserved line is absent from the new plan but must survive.
    let after = ctx
        .parts
        .replace_planned_lines(
            order.id,
            vec![line(Uuid::new_v4(), "Gasket", dec!(1), dec!(5))],
        )
        .await
        .expect("replan");

    let reserved = after
        .iter()
        .find(|l| l.part_id == bearing)
        .expect("reserved line kept");
    assert_eq!(reserved.status, PartReservationStatus::Reserved);
    assert_eq!(after.len(), 2);
}

#[tokio::test]
async fn ledger_walks_forward_and_rebases_cost_on_use() {
    let ctx = setup().await;
    let actor = admin();
    let order = create_order(&ctx, "Consumed parts").await;

    let lines = ctx
        .parts
        .replace_planned_lines(
            order.id,
            vec![line(Uuid::new_v4(), "Filter", dec!(3), dec!(10))],
        )
        .await
        .expect("plan");
    let id = lines[0].id;
    assert_eq!(lines[0].total_cost, dec!(30));

    let reserved = ctx.parts.reserve(id, dec!(3), &actor).await.expect("reserve");
    assert_eq!(reserved.status, PartReservationStatus::Reserved);
    assert_eq!(reserved.reserved_quantity, Some(dec!(3)));
    assert_eq!(reserved.reserved_by, Some(actor.id));

    let issued = ctx.parts.issue(id, &actor).await.expect("issue");
    assert!(issued.issued_at.is_some());

    // Only 2 of 3 actually consumed; the cost follows consumption.
    let used = ctx.parts.use_parts(id, dec!(2), &actor).await.expect("use");
    assert_eq!(used.status, PartReservationStatus::Used);
    assert_eq!(used.used_quantity, Some(dec!(2)));
    assert_eq!(used.total_cost, dec!(20));

    let returned = ctx.parts.return_parts(id, &actor).await.expect("return");
    assert_eq!(returned.status, PartReservationStatus::Returned);
    assert!(returned.returned_at.is_some());
}

#[tokio::test]
async fn ledger_rejects_skipped_and_backward_steps() {
    let ctx = setup().await;
    let actor = admin();
    let order = create_order(&ctx, "Strict ledger").await;

    let lines = ctx
        .parts
        .replace_planned_lines(
            order.id,
            vec![line(Uuid::new_v4(), "Hose clamp", dec!(1), dec!(2))],
        )
        .await
        .expect("plan");
    let id = lines[0].id;

    // planned -> issued skips reserved.
    assert_matches!(
        ctx.parts.issue(id, &actor).await,
        Err(ServiceError::InvalidState(_))
    );
    // planned -> returned is not a thing either.
    assert_matches!(
        ctx.parts.return_parts(id, &actor).await,
        Err(ServiceError::InvalidState(_))
    );

    ctx.parts.reserve(id, dec!(1), &actor).await.expect("reserve");
    // reserved -> reserved is a repeat, not a transition.
    assert_matches!(
        ctx.parts.reserve(id, dec!(1), &actor).await,
        Err(ServiceError::InvalidState(_))
    );
}

#[tokio::test]
async fn negative_quantities_are_rejected() {
    let ctx = setup().await;
    let order = create_order(&ctx, "Bad input").await;

    assert_matches!(
        ctx.parts
            .replace_planned_lines(
                order.id,
                vec![line(Uuid::new_v4(), "Ghost part", dec!(-1), dec!(5))],
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );
}
