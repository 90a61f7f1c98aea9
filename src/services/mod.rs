pub mod executions;
pub mod parts;
pub mod scheduling;
pub mod work_orders;

pub use executions::ExecutionService;
pub use parts::PartReservationService;
pub use scheduling::SchedulingService;
pub use work_orders::WorkOrderService;
