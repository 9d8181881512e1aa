use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::{LineItem, Order, OrderStatus, OrderWithUser, Repository};
use crate::security::{AccessPolicy, Actor};
use crate::utils::error::{ApiError, FieldError};

/// Orders visible to an actor: admins see everything with the owning user,
/// everyone else sees only their own.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OrderListing {
    All(Vec<OrderWithUser>),
    Mine(Vec<Order>),
}

impl OrderListing {
    pub fn len(&self) -> usize {
        match self {
            Self::All(orders) => orders.len(),
            Self::Mine(orders) => orders.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Order creation, total computation and status transitions.
pub struct OrderService {
    repository: Arc<Repository>,
}

impl OrderService {
    pub fn new(repository: Arc<Repository>) -> Self {
        Self { repository }
    }

    /// Create an order from a cart snapshot. The line items are captured as
    /// given; they never reference live menu items.
    pub async fn place_order(
        &self,
        actor: &Actor,
        items: Vec<LineItem>,
        notes: Option<String>,
    ) -> Result<Order, ApiError> {
        validate_line_items(&items)?;

        let total = compute_total(&items);

        let order = self
            .repository
            .insert_order(actor.id, &items, total, notes.as_deref())
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!(
            "Order {} placed by user {} (total {})",
            order.id, actor.id, order.total_amount
        );

        Ok(order)
    }

    /// Change an order's status. Admin only; the actor is checked before the
    /// order is even looked up, so existence is not leaked to non-admins.
    /// All transitions between recognized states are permitted — a backward
    /// move is logged but not rejected.
    pub async fn update_status(
        &self,
        actor: &Actor,
        order_id: i64,
        new_status: &str,
    ) -> Result<Order, ApiError> {
        AccessPolicy::require_admin(actor)?;

        let order = self
            .repository
            .get_order(order_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", order_id)))?;

        let status = OrderStatus::parse(new_status).ok_or_else(|| {
            ApiError::validation(
                "status",
                "must be one of pending, processing, completed, cancelled",
            )
        })?;

        if let Some(current) = OrderStatus::parse(&order.status) {
            if status.sequence_rank() < current.sequence_rank() {
                warn!(
                    "Order {} moved backwards: {} -> {}",
                    order_id, order.status, new_status
                );
            }
        }

        let updated = self
            .repository
            .update_order_status(order_id, status.as_str())
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", order_id)))?;

        info!(
            "Order {} status changed to {} by user {}",
            order_id, updated.status, actor.id
        );

        Ok(updated)
    }

    pub async fn list_orders(&self, actor: &Actor) -> Result<OrderListing, ApiError> {
        if actor.is_admin() {
            let orders = self
                .repository
                .list_all_orders()
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
            Ok(OrderListing::All(orders))
        } else {
            let orders = self
                .repository
                .list_orders_for_user(actor.id, None)
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
            Ok(OrderListing::Mine(orders))
        }
    }

    /// The actor's newest orders, for the dashboard.
    pub async fn recent_orders(&self, actor: &Actor, limit: i64) -> Result<Vec<Order>, ApiError> {
        self.repository
            .list_orders_for_user(actor.id, Some(limit))
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }
}

fn validate_line_items(items: &[LineItem]) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::validation(
            "items",
            "at least one line item is required",
        ));
    }

    let mut errors = Vec::new();
    for (index, item) in items.iter().enumerate() {
        if item.name.trim().is_empty() {
            errors.push(FieldError::new(
                format!("items[{}].name", index),
                "must not be empty",
            ));
        }
        if item.quantity < 1 {
            errors.push(FieldError::new(
                format!("items[{}].quantity", index),
                "must be at least 1",
            ));
        }
        if item.price < Decimal::ZERO {
            errors.push(FieldError::new(
                format!("items[{}].price", index),
                "must be at least 0",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

/// Sum of quantity × price over all line items, rounded to currency
/// precision.
pub fn compute_total(items: &[LineItem]) -> Decimal {
    let total: Decimal = items.iter().map(LineItem::line_total).sum();
    total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn item(name: &str, quantity: i32, price: &str) -> LineItem {
        LineItem {
            name: name.to_string(),
            quantity,
            price: Decimal::from_str(price).unwrap(),
        }
    }

    #[test]
    fn espresso_and_croissant_total_eleven() {
        let items = vec![item("Espresso", 2, "3.50"), item("Croissant", 1, "4.00")];
        assert_eq!(compute_total(&items), Decimal::from_str("11.00").unwrap());
    }

    #[test]
    fn total_rounds_midpoints_away_from_zero() {
        // 3 x 0.335 = 1.005 -> 1.01
        let items = vec![item("Sugar Shot", 3, "0.335")];
        assert_eq!(compute_total(&items), Decimal::from_str("1.01").unwrap());
    }

    #[test]
    fn total_of_free_items_is_zero() {
        let items = vec![item("Water", 4, "0")];
        assert_eq!(compute_total(&items), Decimal::ZERO);
    }

    #[test]
    fn empty_cart_is_rejected() {
        match validate_line_items(&[]) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors[0].field, "items");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let items = vec![item("Espresso", 0, "3.50")];
        match validate_line_items(&items) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "items[0].quantity");
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn negative_price_is_rejected_zero_is_not() {
        let items = vec![item("Espresso", 1, "-0.01")];
        match validate_line_items(&items) {
            Err(ApiError::Validation(errors)) => {
                assert_eq!(errors[0].field, "items[0].price");
            }
            other => panic!("expected Validation, got {:?}", other),
        }

        let items = vec![item("Tap Water", 1, "0.00")];
        assert!(validate_line_items(&items).is_ok());
    }

    #[test]
    fn every_invalid_item_is_reported_with_its_index() {
        let items = vec![
            item("Espresso", 2, "3.50"),
            item("", 0, "3.00"),
            item("Latte", 1, "-1.00"),
        ];
        match validate_line_items(&items) {
            Err(ApiError::Validation(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(
                    fields,
                    vec!["items[1].name", "items[1].quantity", "items[2].price"]
                );
            }
            other => panic!("expected Validation, got {:?}", other),
        }
    }

    #[test]
    fn listing_len_counts_both_variants() {
        let listing = OrderListing::Mine(vec![]);
        assert!(listing.is_empty());
        let listing = OrderListing::All(vec![]);
        assert_eq!(listing.len(), 0);
    }
}
