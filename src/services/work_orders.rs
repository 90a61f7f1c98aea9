//! Work order lifecycle: creation, numbering, and the status state machine.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::Actor,
    clock::Clock,
    db::{is_unique_violation, DbPool},
    entities::{status_history, work_order, work_order_type},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        priority_score, PriorityLabel, WorkOrderCategory, WorkOrderRelationship, WorkOrderSource,
        WorkOrderStatus,
    },
};

/// Attempts at claiming a work order number before giving up. The unique
/// index is authoritative; the scan-max computation is only a starting guess.
const NUMBER_RETRY_ATTEMPTS: u32 = 3;

/// Input for work order creation.
#[derive(Debug, Clone)]
pub struct CreateWorkOrder {
    pub title: String,
    pub description: Option<String>,
    pub category: WorkOrderCategory,
    pub type_id: Option<Uuid>,
    pub priority: Option<PriorityLabel>,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<Decimal>,
    pub estimated_parts_cost: Option<Decimal>,
    pub estimated_labor_cost: Option<Decimal>,
    pub source: WorkOrderSource,
    pub related_work_order_id: Option<Uuid>,
    pub relationship: Option<WorkOrderRelationship>,
}

/// Filters for the work order listing.
#[derive(Debug, Clone, Default)]
pub struct WorkOrderFilters {
    pub status: Option<WorkOrderStatus>,
    pub category: Option<WorkOrderCategory>,
    pub assigned_technician: Option<Uuid>,
}

#[derive(Clone)]
pub struct WorkOrderService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    clock: Arc<dyn Clock>,
}

impl WorkOrderService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            event_sender,
            clock,
        }
    }

    /// Creates a work order in `requested` status with a freshly claimed
    /// number. Type defaults (priority, SLA-derived due date) apply when the
    /// request omits them.
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_work_order(
        &self,
        input: CreateWorkOrder,
        requester: &Actor,
    ) -> Result<work_order::Model, ServiceError> {
        if input.title.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "title cannot be empty".to_string(),
            ));
        }
        for (label, value) in [
            ("estimated_hours", input.estimated_hours),
            ("estimated_parts_cost", input.estimated_parts_cost),
            ("estimated_labor_cost", input.estimated_labor_cost),
        ] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(format!(
                        "{label} cannot be negative"
                    )));
                }
            }
        }
        if input.relationship.is_some() && input.related_work_order_id.is_none() {
            return Err(ServiceError::ValidationError(
                "relationship tag given without a related work order".to_string(),
            ));
        }

        let now = self.clock.now();
        let (source_type, source_id) = input.source.into_columns();

        let mut last_err: Option<ServiceError> = None;
        for attempt in 1..=NUMBER_RETRY_ATTEMPTS {
            let txn = self.db.begin().await?;

            let order_type = match input.type_id {
                Some(type_id) => Some(
                    work_order_type::Entity::find_by_id(type_id)
                        .one(&txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Work order type {type_id} not found"))
                        })?,
                ),
                None => None,
            };

            let priority = input
                .priority
                .or_else(|| order_type.as_ref().map(|t| t.default_priority))
                .unwrap_or(PriorityLabel::Normal);
            let due_date = input.due_date.or_else(|| {
                order_type
                    .as_ref()
                    .and_then(|t| t.sla_hours)
                    .map(|h| now + Duration::hours(h as i64))
            });

            let number = generate_number(&txn, now).await?;
            let parts_cost = input.estimated_parts_cost.unwrap_or(Decimal::ZERO);
            let labor_cost = input.estimated_labor_cost.unwrap_or(Decimal::ZERO);

            let model = work_order::ActiveModel {
                work_order_number: Set(number.clone()),
                title: Set(input.title.clone()),
                description: Set(input.description.clone()),
                category: Set(input.category),
                type_id: Set(input.type_id),
                status: Set(WorkOrderStatus::Requested),
                priority: Set(priority),
                due_date: Set(due_date),
                estimated_hours: Set(input.estimated_hours),
                estimated_parts_cost: Set(parts_cost),
                estimated_labor_cost: Set(labor_cost),
                estimated_total_cost: Set(parts_cost + labor_cost),
                source_type: Set(source_type),
                source_id: Set(source_id),
                related_work_order_id: Set(input.related_work_order_id),
                relationship: Set(input.relationship),
                requested_by: Set(requester.id),
                requested_at: Set(now),
                // Stamped from the injected clock so age-based scoring agrees
                // with requested_at; before_save only fills these when unset.
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };

            match model.insert(&txn).await {
                Ok(created) => {
                    txn.commit().await?;
                    info!(
                        work_order_number = %created.work_order_number,
                        "work order created"
                    );
                    self.event_sender
                        .publish(Event::WorkOrderCreated {
                            work_order_id: created.id,
                            work_order_number: created.work_order_number.clone(),
                        })
                        .await;
                    return Ok(created);
                }
                Err(e) if is_unique_violation(&e) => {
                    warn!(
                        attempt,
                        number, "work order number already claimed; retrying"
                    );
                    let _ = txn.rollback().await;
                    last_err = Some(ServiceError::DatabaseError(e));
                }
                Err(e) => {
                    let _ = txn.rollback().await;
                    return Err(ServiceError::DatabaseError(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ServiceError::InternalError("work order number generation exhausted retries".into())
        }))
    }

    /// Moves a work order to `target`, enforcing the transition table and the
    /// optimistic version check. Status change and history entry commit as
    /// one unit; on any failure nothing is mutated.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn transition(
        &self,
        order_id: Uuid,
        target: WorkOrderStatus,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<work_order::Model, ServiceError> {
        let now = self.clock.now();
        let txn = self.db.begin().await?;

        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;

        let from = order.status;
        if !from.can_transition_to(target) {
            return Err(ServiceError::InvalidTransition { from, to: target });
        }

        let mut am = work_order::ActiveModel {
            status: Set(target),
            ..Default::default()
        };
        match target {
            WorkOrderStatus::Approved => {
                am.approved_by = Set(Some(actor.id));
                am.approved_at = Set(Some(now));
            }
            WorkOrderStatus::Planned => {
                am.planned_by = Set(Some(actor.id));
                am.planned_at = Set(Some(now));
            }
            WorkOrderStatus::Verified => {
                am.verified_by = Set(Some(actor.id));
                am.verified_at = Set(Some(now));
            }
            WorkOrderStatus::Closed => {
                am.closed_by = Set(Some(actor.id));
                am.closed_at = Set(Some(now));
            }
            _ => {}
        }

        apply_guarded(&txn, order_id, order.version, now, am).await?;
        append_history(&txn, order_id, from, target, actor, reason, now).await?;

        let updated = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        txn.commit().await?;

        info!(%from, %target, "work order transitioned");
        self.event_sender
            .publish(Event::WorkOrderTransitioned {
                work_order_id: order_id,
                from,
                to: target,
            })
            .await;
        Ok(updated)
    }

    /// Updates estimate fields, recomputing `estimated_total_cost` as the sum
    /// of its two components.
    #[instrument(skip(self))]
    pub async fn update_estimates(
        &self,
        order_id: Uuid,
        estimated_hours: Option<Decimal>,
        estimated_parts_cost: Option<Decimal>,
        estimated_labor_cost: Option<Decimal>,
    ) -> Result<work_order::Model, ServiceError> {
        for (label, value) in [
            ("estimated_hours", estimated_hours),
            ("estimated_parts_cost", estimated_parts_cost),
            ("estimated_labor_cost", estimated_labor_cost),
        ] {
            if let Some(v) = value {
                if v < Decimal::ZERO {
                    return Err(ServiceError::ValidationError(format!(
                        "{label} cannot be negative"
                    )));
                }
            }
        }

        let now = self.clock.now();
        let txn = self.db.begin().await?;
        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;

        let parts = estimated_parts_cost.unwrap_or(order.estimated_parts_cost);
        let labor = estimated_labor_cost.unwrap_or(order.estimated_labor_cost);

        let mut am = work_order::ActiveModel {
            estimated_parts_cost: Set(parts),
            estimated_labor_cost: Set(labor),
            estimated_total_cost: Set(parts + labor),
            ..Default::default()
        };
        if estimated_hours.is_some() {
            am.estimated_hours = Set(estimated_hours);
        }
        apply_guarded(&txn, order_id, order.version, now, am).await?;

        let updated = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        txn.commit().await?;
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn get_work_order(
        &self,
        order_id: Uuid,
    ) -> Result<Option<work_order::Model>, ServiceError> {
        Ok(work_order::Entity::find_by_id(order_id)
            .one(self.db.as_ref())
            .await?)
    }

    /// The derived 0-100 urgency score, recomputed on demand.
    #[instrument(skip(self))]
    pub async fn score(&self, order_id: Uuid) -> Result<u8, ServiceError> {
        let order = work_order::Entity::find_by_id(order_id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        Ok(priority_score(
            order.priority,
            order.created_at,
            order.due_date,
            self.clock.now(),
        ))
    }

    #[instrument(skip(self))]
    pub async fn list_work_orders(
        &self,
        filters: WorkOrderFilters,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<work_order::Model>, u64), ServiceError> {
        if page == 0 || page_size == 0 {
            return Err(ServiceError::ValidationError(
                "page and page_size must be positive".to_string(),
            ));
        }
        let db = self.db.as_ref();

        let mut query = work_order::Entity::find();
        if let Some(status) = filters.status {
            query = query.filter(work_order::Column::Status.eq(status));
        }
        if let Some(category) = filters.category {
            query = query.filter(work_order::Column::Category.eq(category));
        }
        if let Some(technician) = filters.assigned_technician {
            query = query.filter(work_order::Column::AssignedTechnician.eq(technician));
        }

        let total = query.clone().count(db).await?;
        let orders = query
            .order_by_desc(work_order::Column::CreatedAt)
            .offset((page - 1) * page_size)
            .limit(page_size)
            .all(db)
            .await?;
        Ok((orders, total))
    }

    /// The append-only transition log, oldest first.
    #[instrument(skip(self))]
    pub async fn status_history(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<status_history::Model>, ServiceError> {
        Ok(status_history::Entity::find()
            .filter(status_history::Column::WorkOrderId.eq(order_id))
            .order_by_asc(status_history::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?)
    }
}

/// Computes the next `WO-<year>-<month>-<seq>` number within the caller's
/// transaction. The monthly sequence is max existing suffix plus one; the
/// unique index on `work_order_number` resolves concurrent ties.
pub(crate) async fn generate_number<C: ConnectionTrait>(
    conn: &C,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let prefix = format!("WO-{}-{:02}-", now.year(), now.month());
    let numbers: Vec<String> = work_order::Entity::find()
        .select_only()
        .column(work_order::Column::WorkOrderNumber)
        .filter(work_order::Column::WorkOrderNumber.starts_with(&prefix))
        .into_tuple()
        .all(conn)
        .await?;
    let max = numbers
        .iter()
        .filter_map(|n| parse_sequence(n, &prefix))
        .max()
        .unwrap_or(0);
    Ok(format!("{prefix}{:04}", max + 1))
}

fn parse_sequence(number: &str, prefix: &str) -> Option<u32> {
    number.strip_prefix(prefix)?.parse().ok()
}

/// Version-checked write to a work order row. `rows_affected == 0` means a
/// concurrent writer got there first and the caller's read is stale.
pub(crate) async fn apply_guarded<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    read_version: i32,
    now: DateTime<Utc>,
    mut am: work_order::ActiveModel,
) -> Result<(), ServiceError> {
    am.version = Set(read_version + 1);
    am.updated_at = Set(now);
    let result = work_order::Entity::update_many()
        .set(am)
        .filter(work_order::Column::Id.eq(order_id))
        .filter(work_order::Column::Version.eq(read_version))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(order_id));
    }
    Ok(())
}

/// Appends the audit entry for a successful transition. Always called inside
/// the same transaction as the status write.
pub(crate) async fn append_history<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    from: WorkOrderStatus,
    to: WorkOrderStatus,
    actor: &Actor,
    reason: Option<String>,
    now: DateTime<Utc>,
) -> Result<(), ServiceError> {
    status_history::ActiveModel {
        work_order_id: Set(order_id),
        from_status: Set(from),
        to_status: Set(to),
        actor_id: Set(actor.id),
        actor_name: Set(actor.name.clone()),
        reason: Set(reason),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_parsing_ignores_foreign_numbers() {
        let prefix = "WO-2026-08-";
        assert_eq!(parse_sequence("WO-2026-08-0042", prefix), Some(42));
        assert_eq!(parse_sequence("WO-2026-07-0042", prefix), None);
        assert_eq!(parse_sequence("WO-2026-08-x", prefix), None);
    }
}
