//! Execution tracking: start/pause/resume/complete timing for one work order.
//!
//! The execution row and its work order are always updated together inside a
//! single transaction; neither record ever reflects a half-applied change.

use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, ModelTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    clock::Clock,
    db::DbPool,
    entities::{checklist_item, execution, work_order},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ExecutionStatus, WorkOrderStatus},
    services::work_orders::{append_history, apply_guarded},
};

/// Completion-time inputs: checklist flags, narrative, and optional cost
/// override.
#[derive(Debug, Clone, Default)]
pub struct CompleteExecution {
    pub safety_briefing_done: bool,
    pub quality_check_done: bool,
    pub tools_returned: bool,
    pub area_cleaned: bool,
    pub work_summary: Option<String>,
    pub actual_cost: Option<Decimal>,
}

#[derive(Clone)]
pub struct ExecutionService {
    db: Arc<DbPool>,
    event_sender: EventSender,
    clock: Arc<dyn Clock>,
}

impl ExecutionService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            event_sender,
            clock,
        }
    }

    /// Starts execution of a scheduled work order: creates the execution row
    /// and moves the order to `in_progress` with `actual_start` stamped.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn start(
        &self,
        order_id: Uuid,
        actor: &Actor,
    ) -> Result<execution::Model, ServiceError> {
        let now = self.clock.now();
        let txn = self.db.begin().await?;

        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        if order.status != WorkOrderStatus::Scheduled {
            return Err(ServiceError::InvalidState(format!(
                "work order {} is '{}', not startable",
                order.work_order_number, order.status
            )));
        }
        if find_by_order(&txn, order_id).await?.is_some() {
            return Err(ServiceError::InvalidState(format!(
                "work order {} already has an execution",
                order.work_order_number
            )));
        }

        let technician = order.assigned_technician.unwrap_or(actor.id);
        let created = execution::ActiveModel {
            work_order_id: Set(order_id),
            technician_id: Set(technician),
            status: Set(ExecutionStatus::InProgress),
            started_at: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        apply_guarded(
            &txn,
            order_id,
            order.version,
            now,
            work_order::ActiveModel {
                status: Set(WorkOrderStatus::InProgress),
                actual_start: Set(Some(now)),
                ..Default::default()
            },
        )
        .await?;
        append_history(
            &txn,
            order_id,
            order.status,
            WorkOrderStatus::InProgress,
            actor,
            None,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(%order_id, "execution started");
        self.event_sender
            .publish(Event::ExecutionStarted {
                work_order_id: order_id,
                execution_id: created.id,
            })
            .await;
        Ok(created)
    }

    /// Pauses a running execution. A no-op when not `in_progress`, so
    /// duplicate or retried client requests are harmless.
    #[instrument(skip(self))]
    pub async fn pause(&self, order_id: Uuid) -> Result<execution::Model, ServiceError> {
        let now = self.clock.now();
        let db = self.db.as_ref();
        let exec = require_execution(db, order_id).await?;

        if exec.status != ExecutionStatus::InProgress {
            return Ok(exec);
        }

        let mut am: execution::ActiveModel = exec.into();
        am.status = Set(ExecutionStatus::Paused);
        am.paused_at = Set(Some(now));
        am.updated_at = Set(now);
        let updated = am.update(db).await?;

        self.event_sender
            .publish(Event::ExecutionPaused {
                work_order_id: order_id,
            })
            .await;
        Ok(updated)
    }

    /// Resumes a paused execution, folding the elapsed pause (whole minutes)
    /// into `total_pause_minutes`. A no-op when not paused.
    #[instrument(skip(self))]
    pub async fn resume(&self, order_id: Uuid) -> Result<execution::Model, ServiceError> {
        let now = self.clock.now();
        let db = self.db.as_ref();
        let exec = require_execution(db, order_id).await?;

        if exec.status != ExecutionStatus::Paused {
            return Ok(exec);
        }
        let paused_at = exec.paused_at.ok_or_else(|| {
            ServiceError::InternalError(format!(
                "execution {} is paused without paused_at",
                exec.id
            ))
        })?;

        let pause_minutes = (now - paused_at).num_minutes().max(0);
        let total = exec.total_pause_minutes + pause_minutes;

        let mut am: execution::ActiveModel = exec.into();
        am.status = Set(ExecutionStatus::InProgress);
        am.paused_at = Set(None);
        am.resumed_at = Set(Some(now));
        am.total_pause_minutes = Set(total);
        am.updated_at = Set(now);
        let updated = am.update(db).await?;

        self.event_sender
            .publish(Event::ExecutionResumed {
                work_order_id: order_id,
            })
            .await;
        Ok(updated)
    }

    /// Completes an execution. Gated on required checklist items; computes
    /// `actual_hours = round((worked minutes - pause minutes) / 60, 2)` and
    /// writes actuals back to the work order, transitioning it to
    /// `completed` in the same transaction.
    #[instrument(skip(self, actor, fields), fields(actor = %actor.id))]
    pub async fn complete(
        &self,
        order_id: Uuid,
        actor: &Actor,
        fields: CompleteExecution,
    ) -> Result<execution::Model, ServiceError> {
        let now = self.clock.now();
        let txn = self.db.begin().await?;

        let exec = require_execution(&txn, order_id).await?;
        if exec.status == ExecutionStatus::Completed {
            return Err(ServiceError::InvalidState(format!(
                "execution for work order {order_id} is already completed"
            )));
        }

        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        if !order.status.can_transition_to(WorkOrderStatus::Completed) {
            return Err(ServiceError::InvalidTransition {
                from: order.status,
                to: WorkOrderStatus::Completed,
            });
        }

        let (required, answered) = checklist_counts(&txn, order_id).await?;
        if answered < required {
            return Err(ServiceError::IncompleteRequiredTasks { answered, required });
        }

        // Fold an outstanding pause in before computing worked time.
        let mut total_pause = exec.total_pause_minutes;
        if exec.status == ExecutionStatus::Paused {
            if let Some(paused_at) = exec.paused_at {
                total_pause += (now - paused_at).num_minutes().max(0);
            }
        }
        let worked_minutes = ((now - exec.started_at).num_minutes() - total_pause).max(0);
        let actual_hours = (Decimal::from(worked_minutes) / Decimal::from(60)).round_dp(2);

        let from = order.status;
        let mut am: execution::ActiveModel = exec.into();
        am.status = Set(ExecutionStatus::Completed);
        am.completed_at = Set(Some(now));
        am.paused_at = Set(None);
        am.total_pause_minutes = Set(total_pause);
        am.safety_briefing_done = Set(fields.safety_briefing_done);
        am.quality_check_done = Set(fields.quality_check_done);
        am.tools_returned = Set(fields.tools_returned);
        am.area_cleaned = Set(fields.area_cleaned);
        am.work_summary = Set(fields.work_summary.clone());
        am.updated_at = Set(now);
        let updated = am.update(&txn).await?;

        let mut order_am = work_order::ActiveModel {
            status: Set(WorkOrderStatus::Completed),
            actual_end: Set(Some(now)),
            actual_hours: Set(Some(actual_hours)),
            ..Default::default()
        };
        if fields.actual_cost.is_some() {
            order_am.actual_cost = Set(fields.actual_cost);
        }
        apply_guarded(&txn, order_id, order.version, now, order_am).await?;
        append_history(
            &txn,
            order_id,
            from,
            WorkOrderStatus::Completed,
            actor,
            None,
            now,
        )
        .await?;
        txn.commit().await?;

        info!(%order_id, %actual_hours, "execution completed");
        self.event_sender
            .publish(Event::ExecutionCompleted {
                work_order_id: order_id,
                actual_hours,
            })
            .await;
        Ok(updated)
    }

    /// Cancels an execution: deletes the row (its timing data is not
    /// salvageable) and reverts the work order to `approved`, with the reason
    /// recorded in the history log. Destructive and non-undoable.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn cancel_execution(
        &self,
        order_id: Uuid,
        actor: &Actor,
        reason: String,
    ) -> Result<work_order::Model, ServiceError> {
        let now = self.clock.now();
        let txn = self.db.begin().await?;

        let exec = require_execution(&txn, order_id).await?;
        if exec.status == ExecutionStatus::Completed {
            return Err(ServiceError::InvalidState(format!(
                "execution for work order {order_id} is completed and cannot be cancelled"
            )));
        }

        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        let from = order.status;

        exec.delete(&txn).await?;
        apply_guarded(
            &txn,
            order_id,
            order.version,
            now,
            work_order::ActiveModel {
                status: Set(WorkOrderStatus::Approved),
                actual_start: Set(None),
                actual_end: Set(None),
                actual_hours: Set(None),
                ..Default::default()
            },
        )
        .await?;
        append_history(
            &txn,
            order_id,
            from,
            WorkOrderStatus::Approved,
            actor,
            Some(reason.clone()),
            now,
        )
        .await?;

        let updated = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {order_id} not found")))?;
        txn.commit().await?;

        info!(%order_id, "execution cancelled");
        self.event_sender
            .publish(Event::ExecutionCancelled {
                work_order_id: order_id,
                reason,
            })
            .await;
        Ok(updated)
    }

    /// Minutes of hands-on work so far: wall time minus pauses, using `now`
    /// while still running. Purely a projection, never persisted.
    #[instrument(skip(self))]
    pub async fn actual_duration_minutes(&self, order_id: Uuid) -> Result<i64, ServiceError> {
        let exec = require_execution(self.db.as_ref(), order_id).await?;
        let now = self.clock.now();

        let end = exec.completed_at.unwrap_or(now);
        let mut pause = exec.total_pause_minutes;
        if exec.status == ExecutionStatus::Paused {
            if let Some(paused_at) = exec.paused_at {
                pause += (now - paused_at).num_minutes().max(0);
            }
        }
        Ok(((end - exec.started_at).num_minutes() - pause).max(0))
    }

    /// Percentage of required checklist items answered. 100 for a completed
    /// execution with no checklist; 0 when there are no required items and
    /// the execution is not complete.
    #[instrument(skip(self))]
    pub async fn completion_percentage(&self, order_id: Uuid) -> Result<u8, ServiceError> {
        let db = self.db.as_ref();
        let exec = find_by_order(db, order_id).await?;
        let (required, answered) = checklist_counts(db, order_id).await?;

        let completed = exec
            .map(|e| e.status == ExecutionStatus::Completed)
            .unwrap_or(false);
        if required == 0 {
            return Ok(if completed { 100 } else { 0 });
        }
        let pct = (100 * answered + required / 2) / required;
        Ok(pct.min(100) as u8)
    }

    /// Records an answer to a checklist item.
    #[instrument(skip(self, answer))]
    pub async fn answer_checklist_item(
        &self,
        item_id: Uuid,
        answer: Option<String>,
    ) -> Result<checklist_item::Model, ServiceError> {
        let db = self.db.as_ref();
        let item = checklist_item::Entity::find_by_id(item_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Checklist item {item_id} not found")))?;

        let mut am: checklist_item::ActiveModel = item.into();
        am.answered = Set(true);
        am.answer = Set(answer);
        am.updated_at = Set(self.clock.now());
        Ok(am.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn get_execution(
        &self,
        order_id: Uuid,
    ) -> Result<Option<execution::Model>, ServiceError> {
        find_by_order(self.db.as_ref(), order_id).await
    }
}

async fn find_by_order<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Option<execution::Model>, ServiceError> {
    Ok(execution::Entity::find()
        .filter(execution::Column::WorkOrderId.eq(order_id))
        .one(conn)
        .await?)
}

async fn require_execution<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<execution::Model, ServiceError> {
    find_by_order(conn, order_id).await?.ok_or_else(|| {
        ServiceError::NotFound(format!("No execution for work order {order_id}"))
    })
}

async fn checklist_counts<C: sea_orm::ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<(u32, u32), ServiceError> {
    let items = checklist_item::Entity::find()
        .filter(checklist_item::Column::WorkOrderId.eq(order_id))
        .filter(checklist_item::Column::Required.eq(true))
        .all(conn)
        .await?;
    let required = items.len() as u32;
    let answered = items.iter().filter(|i| i.answered).count() as u32;
    Ok((required, answered))
}
