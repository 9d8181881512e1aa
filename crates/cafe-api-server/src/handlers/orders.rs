use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::database::{LineItem, Order};
use crate::logging::{ActivityLog, ActivityLogger, ActivityType};
use crate::security::AccessPolicy;
use crate::services::{OrderListing, OrderService};
use crate::utils::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub actor_id: i64,
    /// When set, returns only the actor's newest orders (dashboard view).
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrdersResponse {
    pub orders: OrderListing,
    pub is_admin: bool,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    pub actor_id: i64,
    pub items: Vec<LineItem>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub actor_id: i64,
    pub status: String,
}

pub async fn list_orders_handler(
    Extension(order_service): Extension<Arc<OrderService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<OrdersResponse>, ApiError> {
    info!("List orders request from user {}", query.actor_id);

    let actor = access_policy.resolve_actor(query.actor_id).await?;
    let orders = match query.limit {
        Some(limit) => OrderListing::Mine(order_service.recent_orders(&actor, limit).await?),
        None => order_service.list_orders(&actor).await?,
    };
    let total = orders.len();

    Ok(Json(OrdersResponse {
        orders,
        is_admin: actor.is_admin(),
        total,
    }))
}

pub async fn place_order_handler(
    Extension(order_service): Extension<Arc<OrderService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    info!(
        "Place order request from user {} ({} items)",
        request.actor_id,
        request.items.len()
    );

    let actor = access_policy.resolve_actor(request.actor_id).await?;
    let order = order_service
        .place_order(&actor, request.items, request.notes)
        .await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::OrderPlaced)
            .entity_id(order.id)
            .detail(format!("total {}", order.total_amount))
            .build(),
    );

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn update_order_status_handler(
    Extension(order_service): Extension<Arc<OrderService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    info!(
        "Update order {} status to '{}' request from user {}",
        id, request.status, request.actor_id
    );

    let actor = access_policy.resolve_actor(request.actor_id).await?;
    let order = order_service
        .update_status(&actor, id, &request.status)
        .await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::OrderStatusChanged)
            .entity_id(order.id)
            .detail(format!("status -> {}", order.status))
            .build(),
    );

    Ok(Json(order))
}
