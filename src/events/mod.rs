//! In-process domain events.
//!
//! Services publish events after their transaction commits; publication is
//! best-effort and never affects the operation result. A background task
//! (`process_events`) consumes and logs them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::status::WorkOrderStatus;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event. Failures are reported to the caller but are expected
    /// to be logged and ignored, not propagated into operation results.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget publication used on the post-commit path.
    pub async fn publish(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Domain events emitted by the work order subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    WorkOrderCreated {
        work_order_id: Uuid,
        work_order_number: String,
    },
    WorkOrderTransitioned {
        work_order_id: Uuid,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },
    WorkOrderScheduled {
        work_order_id: Uuid,
        technician_id: Option<Uuid>,
        team_id: Option<Uuid>,
        scheduled_start: DateTime<Utc>,
        scheduled_end: DateTime<Utc>,
    },
    ExecutionStarted {
        work_order_id: Uuid,
        execution_id: Uuid,
    },
    ExecutionPaused {
        work_order_id: Uuid,
    },
    ExecutionResumed {
        work_order_id: Uuid,
    },
    ExecutionCompleted {
        work_order_id: Uuid,
        actual_hours: Decimal,
    },
    ExecutionCancelled {
        work_order_id: Uuid,
        reason: String,
    },
    PartLineTransitioned {
        reservation_id: Uuid,
        work_order_id: Uuid,
        status: String,
    },
    BatchScheduled {
        succeeded: usize,
        failed: usize,
    },
}

/// Consumes events from the channel and logs them. Spawned once at startup.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "domain event");
    }
    info!("Event channel closed; event processor exiting");
}
