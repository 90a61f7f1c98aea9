//! Status enums and the work order transition table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Work order lifecycle states.
///
/// The transition table in [`WorkOrderStatus::allowed_targets`] is the only
/// authority on legal moves; nothing else in the codebase encodes reachability.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "work_order_status")]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderStatus {
    #[sea_orm(string_value = "requested")]
    Requested,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "ready_to_schedule")]
    ReadyToSchedule,
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "on_hold")]
    OnHold,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "verified")]
    Verified,
    #[sea_orm(string_value = "closed")]
    Closed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl WorkOrderStatus {
    /// The fixed transition table. Terminal states return an empty slice.
    pub fn allowed_targets(self) -> &'static [WorkOrderStatus] {
        use WorkOrderStatus::*;
        match self {
            Requested => &[Approved, Rejected, Cancelled],
            Approved => &[Planned, OnHold, Cancelled],
            Planned => &[ReadyToSchedule, OnHold],
            ReadyToSchedule => &[Scheduled, OnHold],
            Scheduled => &[InProgress, OnHold],
            InProgress => &[Completed, OnHold],
            OnHold => &[Approved, Planned, ReadyToSchedule, Scheduled, InProgress],
            Completed => &[Verified, InProgress],
            Verified => &[Closed, Completed],
            Rejected | Closed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, target: WorkOrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// States from which a work order may be handed to the scheduler.
    pub fn is_schedulable(self) -> bool {
        matches!(
            self,
            WorkOrderStatus::Approved | WorkOrderStatus::Planned | WorkOrderStatus::ReadyToSchedule
        )
    }

    pub fn as_str(self) -> &'static str {
        use WorkOrderStatus::*;
        match self {
            Requested => "requested",
            Approved => "approved",
            Rejected => "rejected",
            Planned => "planned",
            ReadyToSchedule => "ready_to_schedule",
            Scheduled => "scheduled",
            InProgress => "in_progress",
            OnHold => "on_hold",
            Completed => "completed",
            Verified => "verified",
            Closed => "closed",
            Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for WorkOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution tracker states (`not_started` is the absence of a row).
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "execution_status")]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "paused")]
    Paused,
    #[sea_orm(string_value = "completed")]
    Completed,
}

/// Part reservation line states; transitions are monotonic with `returned`
/// reachable from any non-planned state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "part_reservation_status")]
#[serde(rename_all = "snake_case")]
pub enum PartReservationStatus {
    #[sea_orm(string_value = "planned")]
    Planned,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "issued")]
    Issued,
    #[sea_orm(string_value = "used")]
    Used,
    #[sea_orm(string_value = "returned")]
    Returned,
}

impl PartReservationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Reserved => "reserved",
            Self::Issued => "issued",
            Self::Used => "used",
            Self::Returned => "returned",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "work_order_category")]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderCategory {
    #[sea_orm(string_value = "preventive")]
    Preventive,
    #[sea_orm(string_value = "corrective")]
    Corrective,
    #[sea_orm(string_value = "inspection")]
    Inspection,
    #[sea_orm(string_value = "project")]
    Project,
    #[sea_orm(string_value = "safety")]
    Safety,
}

/// Tag on the optional link between two work orders.
#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "work_order_relationship")]
#[serde(rename_all = "snake_case")]
pub enum WorkOrderRelationship {
    #[sea_orm(string_value = "follow_up")]
    FollowUp,
    #[sea_orm(string_value = "rework")]
    Rework,
    #[sea_orm(string_value = "duplicate")]
    Duplicate,
}

#[cfg(test)]
mod tests {
    use super::WorkOrderStatus::*;
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for status in [Rejected, Closed, Cancelled] {
            assert!(status.is_terminal(), "{status} should be terminal");
        }
    }

    #[test]
    fn every_state_is_reachable_from_requested() {
        // Breadth-first walk of the table must visit all states.
        let mut seen = vec![Requested];
        let mut frontier = vec![Requested];
        while let Some(next) = frontier.pop() {
            for &target in next.allowed_targets() {
                if !seen.contains(&target) {
                    seen.push(target);
                    frontier.push(target);
                }
            }
        }
        for status in WorkOrderStatus::iter() {
            assert!(seen.contains(&status), "{status} unreachable from requested");
        }
    }

    #[test]
    fn hold_returns_only_to_active_states() {
        assert!(OnHold.can_transition_to(InProgress));
        assert!(!OnHold.can_transition_to(Completed));
        assert!(!OnHold.can_transition_to(Requested));
    }
}
