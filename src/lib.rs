//! Work order lifecycle and scheduling backend.
//!
//! The crate is layered: `entities` (storage rows), `models` (domain enums
//! and pure functions), `services` (transactional operations), `handlers`
//! (HTTP surface). Handlers never touch the database directly.

pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::{response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    clock::Clock,
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{ExecutionService, PartReservationService, SchedulingService, WorkOrderService},
};

/// The service registry, one instance of each, sharing pool, clock, and
/// event channel.
#[derive(Clone)]
pub struct Services {
    pub work_orders: WorkOrderService,
    pub executions: ExecutionService,
    pub parts: PartReservationService,
    pub scheduling: SchedulingService,
}

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub clock: Arc<dyn Clock>,
    pub event_sender: EventSender,
    pub services: Services,
}

impl AppState {
    pub fn new(
        db: Arc<DbPool>,
        config: AppConfig,
        clock: Arc<dyn Clock>,
        event_sender: EventSender,
    ) -> Self {
        let services = Services {
            work_orders: WorkOrderService::new(db.clone(), event_sender.clone(), clock.clone()),
            executions: ExecutionService::new(db.clone(), event_sender.clone(), clock.clone()),
            parts: PartReservationService::new(db.clone(), event_sender.clone(), clock.clone()),
            scheduling: SchedulingService::new(db.clone(), event_sender.clone(), clock.clone()),
        };
        Self {
            db,
            config: Arc::new(config),
            clock,
            event_sender,
            services,
        }
    }
}

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    let work_orders = Router::new()
        .merge(handlers::work_orders::router())
        .merge(handlers::executions::order_router())
        .merge(handlers::parts::order_router());

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/work-orders", work_orders)
        .nest("/api/v1/checklist-items", handlers::executions::checklist_router())
        .nest("/api/v1/part-lines", handlers::parts::line_router())
        .nest("/api/v1/scheduling", handlers::scheduling::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
