pub mod checklist_item;
pub mod execution;
pub mod part_reservation;
pub mod status_history;
pub mod team;
pub mod technician;
pub mod work_order;
pub mod work_order_type;
