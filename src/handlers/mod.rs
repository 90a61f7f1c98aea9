//! HTTP surface. Handlers are thin: extract the actor, check the capability,
//! deserialize, delegate to the service, serialize. No business rules live
//! here.

pub mod executions;
pub mod parts;
pub mod scheduling;
pub mod work_orders;

use crate::{auth::Actor, errors::ServiceError};

/// Capability gate applied at the boundary, before any service call.
pub(crate) fn authorize(actor: &Actor, action: &str) -> Result<(), ServiceError> {
    if actor.can_perform(action) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "actor {} may not perform {action}",
            actor.id
        )))
    }
}
