use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, ConnectionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    PriorityLabel, SourceType, WorkOrderCategory, WorkOrderRelationship, WorkOrderStatus,
};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Human-readable `WO-<year>-<month>-<seq>`; unique, assigned exactly once
    /// at creation.
    #[sea_orm(unique)]
    pub work_order_number: String,
    pub title: String,
    pub description: Option<String>,
    pub category: WorkOrderCategory,
    pub type_id: Option<Uuid>,
    pub status: WorkOrderStatus,
    pub priority: PriorityLabel,
    pub due_date: Option<DateTime<Utc>>,

    // Scheduling fields. Technician and team are mutually exclusive binding
    // authorities; the write path enforces at most one set at a time.
    pub scheduled_start: Option<DateTime<Utc>>,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub assigned_technician: Option<Uuid>,
    pub assigned_team: Option<Uuid>,

    // Actuals, populated only by the execution tracker or explicit
    // completion overrides.
    pub actual_start: Option<DateTime<Utc>>,
    pub actual_end: Option<DateTime<Utc>>,
    pub actual_hours: Option<Decimal>,
    pub actual_cost: Option<Decimal>,

    // Estimates. total = parts + labor, recomputed whenever either changes.
    pub estimated_hours: Option<Decimal>,
    pub estimated_parts_cost: Decimal,
    pub estimated_labor_cost: Decimal,
    pub estimated_total_cost: Decimal,

    // Provenance.
    pub source_type: SourceType,
    pub source_id: Option<Uuid>,
    pub related_work_order_id: Option<Uuid>,
    pub relationship: Option<WorkOrderRelationship>,

    // Actor stamps, each set only at the matching transition.
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub planned_by: Option<Uuid>,
    pub planned_at: Option<DateTime<Utc>>,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub closed_by: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-lock counter; every mutating write checks and bumps it.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::work_order_type::Entity",
        from = "Column::TypeId",
        to = "super::work_order_type::Column::Id"
    )]
    WorkOrderType,
    #[sea_orm(has_many = "super::status_history::Entity")]
    StatusHistory,
    #[sea_orm(has_many = "super::part_reservation::Entity")]
    PartReservations,
    #[sea_orm(has_many = "super::checklist_item::Entity")]
    ChecklistItems,
}

impl Related<super::work_order_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WorkOrderType.def()
    }
}

impl Related<super::status_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusHistory.def()
    }
}

impl Related<super::part_reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartReservations.def()
    }
}

impl Related<super::checklist_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChecklistItems.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = self.id {
                self.id = ActiveValue::Set(Uuid::new_v4());
            }
            if let ActiveValue::NotSet = self.created_at {
                self.created_at = ActiveValue::Set(now);
            }
            if let ActiveValue::NotSet = self.version {
                self.version = ActiveValue::Set(1);
            }
        }

        if let ActiveValue::NotSet = self.updated_at {
            self.updated_at = ActiveValue::Set(now);
        }

        Ok(self)
    }
}
