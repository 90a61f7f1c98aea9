//! Work order provenance.
//!
//! Stored as a `(source_type, source_id)` column pair; exposed to the rest of
//! the codebase as a sum type so an unknown tag or a missing reference is
//! unrepresentable past the boundary.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, utoipa::ToSchema)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "source_type")]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    #[sea_orm(string_value = "manual")]
    Manual,
    #[sea_orm(string_value = "routine")]
    Routine,
    #[sea_orm(string_value = "sensor")]
    Sensor,
    #[sea_orm(string_value = "inspection_finding")]
    InspectionFinding,
}

/// Where a work order came from, with the typed reference each kind carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkOrderSource {
    Manual,
    Routine { schedule_id: Uuid },
    Sensor { reading_id: Uuid },
    InspectionFinding { finding_id: Uuid },
}

impl Default for WorkOrderSource {
    fn default() -> Self {
        Self::Manual
    }
}

impl WorkOrderSource {
    pub fn into_columns(self) -> (SourceType, Option<Uuid>) {
        match self {
            Self::Manual => (SourceType::Manual, None),
            Self::Routine { schedule_id } => (SourceType::Routine, Some(schedule_id)),
            Self::Sensor { reading_id } => (SourceType::Sensor, Some(reading_id)),
            Self::InspectionFinding { finding_id } => {
                (SourceType::InspectionFinding, Some(finding_id))
            }
        }
    }

    /// Rehydrates from stored columns. A non-manual row without a reference id
    /// means the row violates the write-path validation and is surfaced as an
    /// error rather than a silent `Manual`.
    pub fn from_columns(source_type: SourceType, source_id: Option<Uuid>) -> Result<Self, String> {
        match (source_type, source_id) {
            (SourceType::Manual, _) => Ok(Self::Manual),
            (SourceType::Routine, Some(id)) => Ok(Self::Routine { schedule_id: id }),
            (SourceType::Sensor, Some(id)) => Ok(Self::Sensor { reading_id: id }),
            (SourceType::InspectionFinding, Some(id)) => {
                Ok(Self::InspectionFinding { finding_id: id })
            }
            (kind, None) => Err(format!("source of kind {kind:?} is missing its reference id")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_round_trip() {
        let id = Uuid::new_v4();
        for source in [
            WorkOrderSource::Manual,
            WorkOrderSource::Routine { schedule_id: id },
            WorkOrderSource::Sensor { reading_id: id },
            WorkOrderSource::InspectionFinding { finding_id: id },
        ] {
            let (kind, reference) = source.into_columns();
            assert_eq!(WorkOrderSource::from_columns(kind, reference), Ok(source));
        }
    }

    #[test]
    fn non_manual_without_reference_is_rejected() {
        assert!(WorkOrderSource::from_columns(SourceType::Sensor, None).is_err());
    }
}
