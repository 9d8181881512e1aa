use axum::{
    extract::{Extension, Path, Query},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::database::{Role, UserWithRole};
use crate::logging::{ActivityLog, ActivityLogger, ActivityType};
use crate::security::AccessPolicy;
use crate::services::RoleService;
use crate::utils::error::ApiError;

#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub roles: Vec<Role>,
}

#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub actor_id: i64,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserWithRole>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRoleRequest {
    pub actor_id: i64,
    pub role_id: i64,
}

pub async fn list_roles_handler(
    Extension(role_service): Extension<Arc<RoleService>>,
) -> Result<Json<RolesResponse>, ApiError> {
    let roles = role_service.list_roles().await?;

    Ok(Json(RolesResponse { roles }))
}

pub async fn list_users_handler(
    Extension(role_service): Extension<Arc<RoleService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<UsersResponse>, ApiError> {
    info!("List users request from user {}", query.actor_id);

    let actor = access_policy.resolve_actor(query.actor_id).await?;
    let users = role_service.list_users(&actor).await?;
    let total = users.len();

    Ok(Json(UsersResponse { users, total }))
}

pub async fn update_user_role_handler(
    Extension(role_service): Extension<Arc<RoleService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRoleRequest>,
) -> Result<Json<UserWithRole>, ApiError> {
    info!(
        "Update role of user {} to role {} request from user {}",
        id, request.role_id, request.actor_id
    );

    let actor = access_policy.resolve_actor(request.actor_id).await?;
    let user = role_service
        .set_user_role(&actor, id, request.role_id)
        .await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::RoleAssigned)
            .entity_id(user.id)
            .detail(format!("role '{}'", user.role_name))
            .build(),
    );

    Ok(Json(user))
}
