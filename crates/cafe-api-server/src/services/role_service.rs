use std::sync::Arc;
use tracing::info;

use crate::database::{Repository, Role, UserWithRole};
use crate::security::{AccessPolicy, Actor};
use crate::utils::error::ApiError;

/// Role assignment and user listing.
pub struct RoleService {
    repository: Arc<Repository>,
}

impl RoleService {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ApiError> {
        self.repository
            .list_roles()
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// All users with their roles. Admin only.
    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<UserWithRole>, ApiError> {
        AccessPolicy::require_admin(actor)?;

        self.repository
            .list_users_with_roles()
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    /// Assign a role to a user. Admin only.
    pub async fn set_user_role(
        &self,
        actor: &Actor,
        target_user_id: i64,
        role_id: i64,
    ) -> Result<UserWithRole, ApiError> {
        AccessPolicy::require_admin(actor)?;

        if !self
            .repository
            .role_exists(role_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        {
            return Err(ApiError::validation(
                "role_id",
                "selected role does not exist",
            ));
        }

        let updated = self
            .repository
            .set_user_role(target_user_id, role_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        if !updated {
            return Err(ApiError::NotFound(format!(
                "User {} not found",
                target_user_id
            )));
        }

        let user = self
            .repository
            .get_user_with_role(target_user_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("User {} not found", target_user_id)))?;

        info!(
            "User {} role changed to {} by user {}",
            target_user_id, user.role_name, actor.id
        );

        Ok(user)
    }
}
