use std::sync::Arc;
use tracing::{debug, warn};

use crate::database::Repository;
use crate::utils::error::ApiError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// The user performing an operation, with its resolved role. Passed
/// explicitly into every gated operation — no ambient request context.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: i64,
    pub name: String,
    pub role: String,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

/// Role-based access policy.
pub struct AccessPolicy {
    repository: Arc<Repository>,
}

impl AccessPolicy {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// Look up the acting user and its role. The transport layer supplies the
    /// id; an unknown id cannot act at all.
    pub async fn resolve_actor(&self, user_id: i64) -> Result<Actor, ApiError> {
        let user = self
            .repository
            .get_user_with_role(user_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::Unauthorized(format!("Unknown user {}", user_id)))?;

        debug!("Resolved actor {} with role {}", user.id, user.role_name);

        Ok(Actor {
            id: user.id,
            name: user.name,
            role: user.role_name,
        })
    }

    pub fn is_admin(actor: &Actor) -> bool {
        actor.is_admin()
    }

    /// Enforce the admin role (throw error if missing).
    pub fn require_admin(actor: &Actor) -> Result<(), ApiError> {
        if !actor.is_admin() {
            warn!("User {} denied: admin role required", actor.id);
            return Err(ApiError::Forbidden(
                "Administrator role required".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: &str) -> Actor {
        Actor {
            id: 7,
            name: "Test".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn admin_role_passes_require_admin() {
        assert!(AccessPolicy::require_admin(&actor(ROLE_ADMIN)).is_ok());
        assert!(AccessPolicy::is_admin(&actor(ROLE_ADMIN)));
    }

    #[test]
    fn non_admin_roles_are_forbidden() {
        for role in [ROLE_USER, "manager", "", "Admin"] {
            match AccessPolicy::require_admin(&actor(role)) {
                Err(ApiError::Forbidden(_)) => {}
                other => panic!("expected Forbidden for role {:?}, got {:?}", role, other),
            }
        }
    }
}
