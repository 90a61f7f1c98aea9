//! Scheduling: availability, single and batch assignment, calendar and
//! workload projections, and the greedy optimization pass.
//!
//! Conflict detection uses half-open `[scheduled_start, scheduled_end)`
//! intervals throughout, so back-to-back slots never conflict. The optimizer
//! is a deterministic greedy heuristic by design, not a solver: identical
//! inputs always produce identical plans.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc, Weekday};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, IsolationLevel,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::Actor,
    clock::Clock,
    db::DbPool,
    entities::{technician, work_order},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{priority_score, WorkOrderCategory, WorkOrderStatus},
    services::work_orders::{append_history, apply_guarded},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResult {
    pub technician_id: Uuid,
    pub available: bool,
    /// Work orders whose scheduled windows overlap the requested slot.
    pub conflicting: Vec<Uuid>,
}

/// One item of a batch scheduling request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleAssignment {
    pub order_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub technician_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchItemFailure {
    pub index: usize,
    pub order_id: Uuid,
    pub error: String,
}

/// Per-item outcome of a batch call; sibling failures never abort the rest.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchResult {
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<BatchItemFailure>,
}

#[derive(Debug, Clone, Default)]
pub struct CalendarFilters {
    pub technician_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub category: Option<WorkOrderCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalendarEntry {
    pub order_id: Uuid,
    pub work_order_number: String,
    pub title: String,
    pub status: WorkOrderStatus,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalendarGroup {
    pub technician_id: Option<Uuid>,
    pub team_id: Option<Uuid>,
    pub entries: Vec<CalendarEntry>,
}

/// Read-only projection of the scheduled/in-progress orders in a window,
/// grouped per assignee for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CalendarView {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub groups: Vec<CalendarGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UtilizationReport {
    pub technician_id: Uuid,
    pub scheduled_hours: Decimal,
    pub capacity_hours: Decimal,
    /// scheduled / capacity; may exceed 1.0 when overbooked.
    pub utilization: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlannedAssignment {
    pub order_id: Uuid,
    pub technician_id: Uuid,
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UnassignedOrder {
    pub order_id: Uuid,
    pub reason: String,
}

/// Output of the greedy pass. A plan only; nothing is persisted until the
/// caller applies it (typically via `schedule_batch`, which re-validates).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OptimizationPlan {
    pub assigned: Vec<PlannedAssignment>,
    pub unassigned: Vec<UnassignedOrder>,
}

#[derive(Clone)]
pub struct SchedulingService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    clock: Arc<dyn Clock>,
}

impl SchedulingService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            event_sender,
            clock,
        }
    }

    /// Whether `technician` is free in `[start, end)`, with the conflicting
    /// order ids when not.
    #[instrument(skip(self))]
    pub async fn availability(
        &self,
        technician_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<AvailabilityResult, ServiceError> {
        validate_range(start, end)?;
        let db = self.db.as_ref();
        require_technician(db, technician_id).await?;

        let conflicting = conflicting_orders(db, technician_id, start, end, None).await?;
        Ok(AvailabilityResult {
            technician_id,
            available: conflicting.is_empty(),
            conflicting,
        })
    }

    /// Schedules one order into `[start, end)`. The state gate, the conflict
    /// check, the field writes, and the `ready_to_schedule -> scheduled`
    /// transition all happen inside one version-checked transaction, run
    /// serializable so a concurrent scheduler cannot slip an overlapping
    /// window past the conflict check.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn schedule_one(
        &self,
        order_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        technician_id: Option<Uuid>,
        team_id: Option<Uuid>,
        actor: &Actor,
    ) -> Result<work_order::Model, ServiceError> {
        validate_range(start, end)?;
        if technician_id.is_some() && team_id.is_some() {
            return Err(ServiceError::ValidationError(
                "assign either a technician or a team, not both".to_string(),
            ));
        }

        let now = self.clock.now();
        // The order's version column only guards the order row, not the
        // technician's calendar. Under read committed two of these
        // transactions scheduling different orders would each miss the
        // other's window; serializable isolation makes one of them fail
        // instead. SQLite has a single writer and needs no configuration.
        let txn = match self.db.get_database_backend() {
            DbBackend::Postgres => {
                self.db
                    .begin_with_config(Some(IsolationLevel::Serializable), None)
                    .await?
            }
            _ => self.db.begin().await?,
        };

        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        if !order.status.is_schedulable() {
            return Err(ServiceError::InvalidState(format!(
                "work order {} is '{}' and cannot be scheduled",
                order.work_order_number, order.status
            )));
        }

        if let Some(technician_id) = technician_id {
            require_technician(&txn, technician_id).await?;
            let conflicting =
                conflicting_orders(&txn, technician_id, start, end, Some(order_id)).await?;
            if !conflicting.is_empty() {
                return Err(ServiceError::ConflictingAssignment { conflicting });
            }
        }

        let transitions = order.status == WorkOrderStatus::ReadyToSchedule;
        let mut am = work_order::ActiveModel {
            scheduled_start: Set(Some(start)),
            scheduled_end: Set(Some(end)),
            assigned_technician: Set(technician_id),
            assigned_team: Set(team_id),
            ..Default::default()
        };
        if transitions {
            am.status = Set(WorkOrderStatus::Scheduled);
        }
        apply_guarded(&txn, order_id, order.version, now, am).await?;
        if transitions {
            append_history(
                &txn,
                order_id,
                order.status,
                WorkOrderStatus::Scheduled,
                actor,
                None,
                now,
            )
            .await?;
        }

        let updated = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        txn.commit().await?;

        info!(%order_id, %start, %end, "work order scheduled");
        self.event_sender
            .publish(Event::WorkOrderScheduled {
                work_order_id: order_id,
                technician_id,
                team_id,
                scheduled_start: start,
                scheduled_end: end,
            })
            .await;
        Ok(updated)
    }

    /// Schedules a set of assignments, detecting conflicts within the batch
    /// itself before touching storage: when two items hand the same
    /// technician overlapping windows, the earlier input index wins and the
    /// later one fails. Surviving items are committed one at a time and each
    /// re-validates availability at write time; a failure never rolls back
    /// its siblings.
    #[instrument(skip(self, assignments, actor), fields(count = assignments.len(), actor = %actor.id))]
    pub async fn schedule_batch(
        &self,
        assignments: Vec<ScheduleAssignment>,
        actor: &Actor,
    ) -> Result<BatchResult, ServiceError> {
        let mut result = BatchResult {
            succeeded: Vec::new(),
            failed: Vec::new(),
        };
        // Windows accepted so far, per technician.
        let mut accepted: Vec<(Uuid, DateTime<Utc>, DateTime<Utc>)> = Vec::new();

        for (index, item) in assignments.iter().enumerate() {
            if let Some(technician_id) = item.technician_id {
                let in_batch_conflict = accepted.iter().any(|(tech, s, e)| {
                    *tech == technician_id && overlaps(*s, *e, item.start, item.end)
                });
                if in_batch_conflict {
                    result.failed.push(BatchItemFailure {
                        index,
                        order_id: item.order_id,
                        error: "conflicts with an earlier assignment in this batch".to_string(),
                    });
                    continue;
                }
            }

            match self
                .schedule_one(
                    item.order_id,
                    item.start,
                    item.end,
                    item.technician_id,
                    item.team_id,
                    actor,
                )
                .await
            {
                Ok(_) => {
                    if let Some(technician_id) = item.technician_id {
                        accepted.push((technician_id, item.start, item.end));
                    }
                    result.succeeded.push(item.order_id);
                }
                Err(e) => result.failed.push(BatchItemFailure {
                    index,
                    order_id: item.order_id,
                    error: e.to_string(),
                }),
            }
        }

        self.event_sender
            .publish(Event::BatchScheduled {
                succeeded: result.succeeded.len(),
                failed: result.failed.len(),
            })
            .await;
        Ok(result)
    }

    /// Scheduled/in-progress orders intersecting `[start, end)`, grouped per
    /// assignee. Pure read; no mutation.
    #[instrument(skip(self))]
    pub async fn calendar(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filters: CalendarFilters,
    ) -> Result<CalendarView, ServiceError> {
        validate_range(start, end)?;
        let db = self.db.as_ref();

        let mut query = work_order::Entity::find()
            .filter(work_order::Column::Status.is_in([
                WorkOrderStatus::Scheduled,
                WorkOrderStatus::InProgress,
            ]))
            .filter(work_order::Column::ScheduledStart.lt(end))
            .filter(work_order::Column::ScheduledEnd.gt(start));
        if let Some(technician_id) = filters.technician_id {
            query = query.filter(work_order::Column::AssignedTechnician.eq(technician_id));
        }
        if let Some(team_id) = filters.team_id {
            query = query.filter(work_order::Column::AssignedTeam.eq(team_id));
        }
        if let Some(category) = filters.category {
            query = query.filter(work_order::Column::Category.eq(category));
        }

        let orders = query
            .order_by_asc(work_order::Column::ScheduledStart)
            .all(db)
            .await?;

        // BTreeMap keeps group order deterministic.
        let mut groups: BTreeMap<(Option<Uuid>, Option<Uuid>), Vec<CalendarEntry>> =
            BTreeMap::new();
        for order in orders {
            let (Some(s), Some(e)) = (order.scheduled_start, order.scheduled_end) else {
                continue;
            };
            groups
                .entry((order.assigned_technician, order.assigned_team))
                .or_default()
                .push(CalendarEntry {
                    order_id: order.id,
                    work_order_number: order.work_order_number,
                    title: order.title,
                    status: order.status,
                    scheduled_start: s,
                    scheduled_end: e,
                });
        }

        Ok(CalendarView {
            start,
            end,
            groups: groups
                .into_iter()
                .map(|((technician_id, team_id), entries)| CalendarGroup {
                    technician_id,
                    team_id,
                    entries,
                })
                .collect(),
        })
    }

    /// Utilization of one technician over a window: the summed durations of
    /// their scheduled/in-progress orders intersecting it, over their
    /// capacity for the window.
    #[instrument(skip(self))]
    pub async fn workload(
        &self,
        technician_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<UtilizationReport, ServiceError> {
        validate_range(start, end)?;
        let db = self.db.as_ref();
        let tech = require_technician(db, technician_id).await?;

        let orders = assigned_orders_in_window(db, technician_id, start, end).await?;
        let scheduled_hours: Decimal = orders
            .iter()
            .filter_map(|o| window_hours(o.scheduled_start?, o.scheduled_end?))
            .sum();

        let capacity_hours =
            tech.daily_capacity_hours * Decimal::from(weekday_count(start, end));
        let utilization = if capacity_hours > Decimal::ZERO {
            (scheduled_hours / capacity_hours)
                .round_dp(4)
                .to_f64()
                .unwrap_or(f64::INFINITY)
        } else if scheduled_hours > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        };

        Ok(UtilizationReport {
            technician_id,
            scheduled_hours: scheduled_hours.round_dp(2),
            capacity_hours: capacity_hours.round_dp(2),
            utilization,
        })
    }

    /// Greedy assignment of candidate orders to technicians over a window.
    /// Returns a plan; persists nothing.
    #[instrument(skip(self, order_ids, technician_ids), fields(orders = order_ids.len(), technicians = technician_ids.len()))]
    pub async fn optimize(
        &self,
        order_ids: Vec<Uuid>,
        technician_ids: Vec<Uuid>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<OptimizationPlan, ServiceError> {
        validate_range(start, end)?;
        let db = self.db.as_ref();
        let now = self.clock.now();

        let mut candidates = Vec::with_capacity(order_ids.len());
        let mut unassignable = Vec::new();
        for order_id in &order_ids {
            let order = work_order::Entity::find_by_id(*order_id)
                .one(db)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("Work order {order_id} not found"))
                })?;
            if !order.status.is_schedulable() {
                unassignable.push(UnassignedOrder {
                    order_id: *order_id,
                    reason: format!("status '{}' is not schedulable", order.status),
                });
                continue;
            }
            let window = match (order.scheduled_start, order.scheduled_end) {
                (Some(s), Some(e)) => Some((s, e)),
                _ => None,
            };
            candidates.push(Candidate {
                order_id: order.id,
                number: order.work_order_number,
                score: priority_score(order.priority, order.created_at, order.due_date, now),
                due_date: order.due_date,
                estimated_hours: order.estimated_hours,
                window,
            });
        }

        let mut technicians = Vec::with_capacity(technician_ids.len());
        for technician_id in &technician_ids {
            let tech = require_technician(db, *technician_id).await?;
            let existing = assigned_orders_in_window(db, *technician_id, start, end).await?;
            let busy: Vec<(DateTime<Utc>, DateTime<Utc>)> = existing
                .iter()
                .filter(|o| !order_ids.contains(&o.id))
                .filter_map(|o| Some((o.scheduled_start?, o.scheduled_end?)))
                .collect();
            let assigned_hours: Decimal =
                busy.iter().filter_map(|(s, e)| window_hours(*s, *e)).sum();
            technicians.push(TechnicianState {
                id: tech.id,
                capacity_hours: tech.daily_capacity_hours
                    * Decimal::from(weekday_count(start, end)),
                assigned_hours,
                busy,
            });
        }

        let mut plan = plan_assignments(candidates, technicians);
        plan.unassigned.extend(unassignable);
        Ok(plan)
    }
}

// ---------------------------------------------------------------------------
// Pure planning core
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub order_id: Uuid,
    pub number: String,
    pub score: u8,
    pub due_date: Option<DateTime<Utc>>,
    pub estimated_hours: Option<Decimal>,
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

#[derive(Debug, Clone)]
pub(crate) struct TechnicianState {
    pub id: Uuid,
    pub capacity_hours: Decimal,
    pub assigned_hours: Decimal,
    pub busy: Vec<(DateTime<Utc>, DateTime<Utc>)>,
}

impl TechnicianState {
    fn utilization(&self) -> Decimal {
        if self.capacity_hours > Decimal::ZERO {
            self.assigned_hours / self.capacity_hours
        } else {
            Decimal::MAX
        }
    }

    fn remaining(&self) -> Decimal {
        self.capacity_hours - self.assigned_hours
    }
}

/// The greedy pass: candidates by score desc, due date asc (no due date
/// last), number asc; each one goes to the technician with the lowest
/// projected utilization that has no window conflict and enough remaining
/// capacity. Deterministic for identical inputs.
pub(crate) fn plan_assignments(
    mut candidates: Vec<Candidate>,
    mut technicians: Vec<TechnicianState>,
) -> OptimizationPlan {
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
            .then_with(|| a.number.cmp(&b.number))
    });

    let mut plan = OptimizationPlan {
        assigned: Vec::new(),
        unassigned: Vec::new(),
    };

    for candidate in candidates {
        let Some(estimated_hours) = candidate.estimated_hours else {
            plan.unassigned.push(UnassignedOrder {
                order_id: candidate.order_id,
                reason: "no estimated hours".to_string(),
            });
            continue;
        };

        let mut saw_capacity = false;
        let mut best: Option<usize> = None;
        for (i, tech) in technicians.iter().enumerate() {
            if tech.remaining() < estimated_hours {
                continue;
            }
            saw_capacity = true;
            if let Some((s, e)) = candidate.window {
                if tech.busy.iter().any(|(bs, be)| overlaps(*bs, *be, s, e)) {
                    continue;
                }
            }
            let better = match best {
                None => true,
                Some(j) => {
                    let current = &technicians[j];
                    tech.utilization()
                        .cmp(&current.utilization())
                        .then_with(|| tech.assigned_hours.cmp(&current.assigned_hours))
                        .then_with(|| tech.id.cmp(&current.id))
                        .is_lt()
                }
            };
            if better {
                best = Some(i);
            }
        }

        match best {
            Some(i) => {
                let tech = &mut technicians[i];
                tech.assigned_hours += estimated_hours;
                if let Some((s, e)) = candidate.window {
                    tech.busy.push((s, e));
                }
                plan.assigned.push(PlannedAssignment {
                    order_id: candidate.order_id,
                    technician_id: tech.id,
                    scheduled_start: candidate.window.map(|(s, _)| s),
                    scheduled_end: candidate.window.map(|(_, e)| e),
                });
            }
            None => {
                let reason = if saw_capacity {
                    "no technician free in the scheduled window"
                } else {
                    "no technician with remaining capacity"
                };
                plan.unassigned.push(UnassignedOrder {
                    order_id: candidate.order_id,
                    reason: reason.to_string(),
                });
            }
        }
    }

    plan
}

/// Half-open interval overlap: `[a_start, a_end)` vs `[b_start, b_end)`.
pub(crate) fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Weekdays (Mon-Fri) touched by `[start, end)`.
pub(crate) fn weekday_count(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    if end <= start {
        return 0;
    }
    let mut count = 0;
    let mut day = start.date_naive();
    let last = (end - chrono::Duration::seconds(1)).date_naive();
    while day <= last {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            count += 1;
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    count
}

fn window_hours(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Decimal> {
    if end <= start {
        return None;
    }
    Some(Decimal::from((end - start).num_minutes()) / Decimal::from(60))
}

fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), ServiceError> {
    if end <= start {
        return Err(ServiceError::ValidationError(
            "end must be after start".to_string(),
        ));
    }
    Ok(())
}

async fn require_technician<C: ConnectionTrait>(
    conn: &C,
    technician_id: Uuid,
) -> Result<technician::Model, ServiceError> {
    technician::Entity::find_by_id(technician_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Technician {technician_id} not found")))
}

/// Scheduled/in-progress orders for `technician` whose windows overlap
/// `[start, end)`, optionally excluding one order (reschedules).
async fn conflicting_orders<C: ConnectionTrait>(
    conn: &C,
    technician_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Result<Vec<Uuid>, ServiceError> {
    let mut query = work_order::Entity::find()
        .filter(work_order::Column::AssignedTechnician.eq(technician_id))
        .filter(work_order::Column::Status.is_in([
            WorkOrderStatus::Scheduled,
            WorkOrderStatus::InProgress,
        ]))
        .filter(work_order::Column::ScheduledStart.lt(end))
        .filter(work_order::Column::ScheduledEnd.gt(start));
    if let Some(exclude) = exclude {
        query = query.filter(work_order::Column::Id.ne(exclude));
    }
    Ok(query
        .order_by_asc(work_order::Column::ScheduledStart)
        .all(conn)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect())
}

async fn assigned_orders_in_window<C: ConnectionTrait>(
    conn: &C,
    technician_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<work_order::Model>, ServiceError> {
    Ok(work_order::Entity::find()
        .filter(work_order::Column::AssignedTechnician.eq(technician_id))
        .filter(work_order::Column::Status.is_in([
            WorkOrderStatus::Scheduled,
            WorkOrderStatus::InProgress,
        ]))
        .filter(work_order::Column::ScheduledStart.lt(end))
        .filter(work_order::Column::ScheduledEnd.gt(start))
        .all(conn)
        .await?)
}
