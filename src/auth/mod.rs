//! Identity boundary.
//!
//! Identity and authorization live outside this subsystem; callers hand us an
//! opaque [`Actor`] with a coarse capability check. Authorization (may this
//! actor invoke the operation at all) is applied at the handler boundary and
//! is deliberately independent of the state machine's own gating.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Action names checked against [`Actor::can_perform`].
pub mod actions {
    pub const WORK_ORDERS_CREATE: &str = "work_orders:create";
    pub const WORK_ORDERS_TRANSITION: &str = "work_orders:transition";
    pub const WORK_ORDERS_PLAN: &str = "work_orders:plan";
    pub const WORK_ORDERS_READ: &str = "work_orders:read";
    pub const EXECUTION_TRACK: &str = "execution:track";
    pub const PARTS_MANAGE: &str = "parts:manage";
    pub const SCHEDULING_MANAGE: &str = "scheduling:manage";
    pub const SCHEDULING_READ: &str = "scheduling:read";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub roles: Vec<String>,
}

impl Actor {
    pub fn new(id: Uuid, name: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            roles,
        }
    }

    /// Opaque capability check. `admin` may do anything; otherwise an action
    /// `area:verb` requires the `area` role.
    pub fn can_perform(&self, action: &str) -> bool {
        if self.roles.iter().any(|r| r == "admin") {
            return true;
        }
        let area = action.split(':').next().unwrap_or(action);
        self.roles.iter().any(|r| r == area)
    }
}

/// Extracts the acting identity from `x-actor-id`, `x-actor-name`, and
/// `x-actor-roles` headers, as populated by the gateway in front of this
/// service.
#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get("x-actor-id")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or((StatusCode::UNAUTHORIZED, "missing or invalid x-actor-id"))?;

        let name = parts
            .headers
            .get("x-actor-name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        let roles = parts
            .headers
            .get("x-actor-roles")
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Actor { id, name, roles })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_can_do_anything() {
        let actor = Actor::new(Uuid::new_v4(), "root", vec!["admin".into()]);
        assert!(actor.can_perform(actions::SCHEDULING_MANAGE));
        assert!(actor.can_perform(actions::EXECUTION_TRACK));
    }

    #[test]
    fn area_role_scopes_actions() {
        let actor = Actor::new(Uuid::new_v4(), "tech", vec!["execution".into()]);
        assert!(actor.can_perform(actions::EXECUTION_TRACK));
        assert!(!actor.can_perform(actions::WORK_ORDERS_TRANSITION));
    }

    #[test]
    fn estimate_planning_is_a_work_orders_capability() {
        let planner = Actor::new(Uuid::new_v4(), "planner", vec!["work_orders".into()]);
        assert!(planner.can_perform(actions::WORK_ORDERS_PLAN));
        let tech = Actor::new(Uuid::new_v4(), "tech", vec!["execution".into()]);
        assert!(!tech.can_perform(actions::WORK_ORDERS_PLAN));
    }
}
