//! Part reservation ledger: per-line material state for a work order.
//!
//! Line transitions are monotonic (`planned -> reserved -> issued -> used`,
//! `returned` from any non-planned state). Planning-time bulk edits touch
//! `planned` lines only; in-flight material is immutable to them.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    clock::Clock,
    db::DbPool,
    entities::{part_reservation, work_order},
    errors::ServiceError,
    events::{Event, EventSender},
    models::PartReservationStatus,
    services::work_orders::apply_guarded,
};

/// One incoming line in a planning-time bulk edit, keyed by part id.
#[derive(Debug, Clone)]
pub struct PlannedLine {
    pub part_id: Uuid,
    pub part_name: String,
    pub estimated_quantity: Decimal,
    pub unit_cost: Decimal,
}

#[derive(Clone)]
pub struct PartReservationService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    clock: Arc<dyn Clock>,
}

impl PartReservationService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            event_sender,
            clock,
        }
    }

    /// Replaces the planned line set of a work order with `lines`:
    /// matching `planned` lines are updated in place, new lines inserted,
    /// and `planned` lines absent from the input deleted. Lines already
    /// reserved/issued/used are left untouched. The owning work order's parts
    /// estimate is re-rolled up in the same transaction.
    #[instrument(skip(self, lines), fields(line_count = lines.len()))]
    pub async fn replace_planned_lines(
        &self,
        order_id: Uuid,
        lines: Vec<PlannedLine>,
    ) -> Result<Vec<part_reservation::Model>, ServiceError> {
        for line in &lines {
            if line.estimated_quantity < Decimal::ZERO || line.unit_cost < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "quantities and costs cannot be negative".to_string(),
                ));
            }
        }

        let now = self.clock.now();
        let txn = self.db.begin().await?;
        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;

        let existing = part_reservation::Entity::find()
            .filter(part_reservation::Column::WorkOrderId.eq(order_id))
            .all(&txn)
            .await?;

        for row in existing
            .iter()
            .filter(|r| r.status == PartReservationStatus::Planned)
        {
            match lines.iter().find(|l| l.part_id == row.part_id) {
                Some(incoming) => {
                    let mut am: part_reservation::ActiveModel = row.clone().into();
                    am.part_name = Set(incoming.part_name.clone());
                    am.estimated_quantity = Set(incoming.estimated_quantity);
                    am.unit_cost = Set(incoming.unit_cost);
                    am.total_cost = Set(incoming.estimated_quantity * incoming.unit_cost);
                    am.updated_at = Set(now);
                    am.update(&txn).await?;
                }
                None => {
                    row.clone().delete(&txn).await?;
                }
            }
        }

        for incoming in &lines {
            let already_present = existing.iter().any(|r| r.part_id == incoming.part_id);
            if !already_present {
                part_reservation::ActiveModel {
                    work_order_id: Set(order_id),
                    part_id: Set(incoming.part_id),
                    part_name: Set(incoming.part_name.clone()),
                    status: Set(PartReservationStatus::Planned),
                    estimated_quantity: Set(incoming.estimated_quantity),
                    unit_cost: Set(incoming.unit_cost),
                    total_cost: Set(incoming.estimated_quantity * incoming.unit_cost),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        let final_lines = lines_for_order(&txn, order_id).await?;
        let parts_cost: Decimal = final_lines.iter().map(|l| l.total_cost).sum();
        apply_guarded(
            &txn,
            order_id,
            order.version,
            now,
            work_order::ActiveModel {
                estimated_parts_cost: Set(parts_cost),
                estimated_total_cost: Set(parts_cost + order.estimated_labor_cost),
                ..Default::default()
            },
        )
        .await?;

        txn.commit().await?;
        info!(%order_id, lines = final_lines.len(), "planned lines replaced");
        Ok(final_lines)
    }

    /// `planned -> reserved`, recording the committed quantity.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn reserve(
        &self,
        line_id: Uuid,
        quantity: Decimal,
        actor: &Actor,
    ) -> Result<part_reservation::Model, ServiceError> {
        self.advance(line_id, actor, PartReservationStatus::Reserved, Some(quantity))
            .await
    }

    /// `reserved -> issued`: material handed to the technician.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn issue(
        &self,
        line_id: Uuid,
        actor: &Actor,
    ) -> Result<part_reservation::Model, ServiceError> {
        self.advance(line_id, actor, PartReservationStatus::Issued, None)
            .await
    }

    /// `issued -> used`: consumption recorded; the line becomes append-only
    /// history and its cost switches to the used-quantity basis.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn use_parts(
        &self,
        line_id: Uuid,
        quantity: Decimal,
        actor: &Actor,
    ) -> Result<part_reservation::Model, ServiceError> {
        self.advance(line_id, actor, PartReservationStatus::Used, Some(quantity))
            .await
    }

    /// Any non-planned state `-> returned`.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn return_parts(
        &self,
        line_id: Uuid,
        actor: &Actor,
    ) -> Result<part_reservation::Model, ServiceError> {
        self.advance(line_id, actor, PartReservationStatus::Returned, None)
            .await
    }

    #[instrument(skip(self))]
    pub async fn lines(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<part_reservation::Model>, ServiceError> {
        lines_for_order(self.db.as_ref(), order_id).await
    }

    async fn advance(
        &self,
        line_id: Uuid,
        actor: &Actor,
        target: PartReservationStatus,
        quantity: Option<Decimal>,
    ) -> Result<part_reservation::Model, ServiceError> {
        if let Some(q) = quantity {
            if q < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "quantity cannot be negative".to_string(),
                ));
            }
        }

        let now = self.clock.now();
        let txn = self.db.begin().await?;
        let line = part_reservation::Entity::find_by_id(line_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Part line {line_id} not found")))?;

        if !allowed_from(line.status, target) {
            return Err(ServiceError::InvalidState(format!(
                "part line is '{}', cannot move to '{}'",
                line.status.as_str(),
                target.as_str()
            )));
        }

        let work_order_id = line.work_order_id;
        let mut am: part_reservation::ActiveModel = line.clone().into();
        am.status = Set(target);
        match target {
            PartReservationStatus::Reserved => {
                am.reserved_quantity = Set(quantity);
                am.reserved_by = Set(Some(actor.id));
                am.reserved_at = Set(Some(now));
                am.total_cost = Set(line.estimated_quantity * line.unit_cost);
            }
            PartReservationStatus::Issued => {
                am.issued_by = Set(Some(actor.id));
                am.issued_at = Set(Some(now));
            }
            PartReservationStatus::Used => {
                let used = quantity.unwrap_or(line.reserved_quantity.unwrap_or(Decimal::ZERO));
                am.used_quantity = Set(Some(used));
                am.used_by = Set(Some(actor.id));
                am.used_at = Set(Some(now));
                am.total_cost = Set(used * line.unit_cost);
            }
            PartReservationStatus::Returned => {
                am.returned_by = Set(Some(actor.id));
                am.returned_at = Set(Some(now));
            }
            PartReservationStatus::Planned => unreachable!("planned is never a transition target"),
        }
        am.updated_at = Set(now);
        let updated = am.update(&txn).await?;
        txn.commit().await?;

        self.event_sender
            .publish(Event::PartLineTransitioned {
                reservation_id: line_id,
                work_order_id,
                status: target.as_str().to_string(),
            })
            .await;
        Ok(updated)
    }
}

/// The monotonic ledger transition table.
fn allowed_from(from: PartReservationStatus, to: PartReservationStatus) -> bool {
    use PartReservationStatus::*;
    matches!(
        (from, to),
        (Planned, Reserved)
            | (Reserved, Issued)
            | (Issued, Used)
            | (Reserved, Returned)
            | (Issued, Returned)
            | (Used, Returned)
    )
}

async fn lines_for_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<part_reservation::Model>, ServiceError> {
    Ok(part_reservation::Entity::find()
        .filter(part_reservation::Column::WorkOrderId.eq(order_id))
        .order_by_asc(part_reservation::Column::CreatedAt)
        .all(conn)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use PartReservationStatus::*;

    #[rstest]
    #[case(Planned, Reserved, true)]
    #[case(Reserved, Issued, true)]
    #[case(Issued, Used, true)]
    #[case(Planned, Issued, false)]
    #[case(Used, Issued, false)]
    #[case(Reserved, Planned, false)]
    #[case(Used, Used, false)]
    fn ledger_transitions_are_monotonic(
        #[case] from: PartReservationStatus,
        #[case] to: PartReservationStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(allowed_from(from, to), allowed);
    }

    #[test]
    fn returned_is_reachable_from_non_planned_only() {
        assert!(!allowed_from(Planned, Returned));
        for from in [Reserved, Issued, Used] {
            assert!(allowed_from(from, Returned));
        }
    }
}
