pub mod priority;
pub mod source;
pub mod status;

pub use priority::{priority_score, PriorityLabel};
pub use source::{SourceType, WorkOrderSource};
pub use status::{
    ExecutionStatus, PartReservationStatus, WorkOrderCategory, WorkOrderRelationship,
    WorkOrderStatus,
};
