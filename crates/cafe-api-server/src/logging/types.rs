use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Domain events worth an audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    OrderPlaced,
    OrderStatusChanged,
    CategoryCreated,
    CategoryUpdated,
    CategoryDeleted,
    MenuItemCreated,
    MenuItemUpdated,
    MenuItemDeleted,
    RoleAssigned,
}

impl ActivityType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::OrderPlaced => "order_placed",
            Self::OrderStatusChanged => "order_status_changed",
            Self::CategoryCreated => "category_created",
            Self::CategoryUpdated => "category_updated",
            Self::CategoryDeleted => "category_deleted",
            Self::MenuItemCreated => "menu_item_created",
            Self::MenuItemUpdated => "menu_item_updated",
            Self::MenuItemDeleted => "menu_item_deleted",
            Self::RoleAssigned => "role_assigned",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Success,
    Error,
    Warning,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// Complete activity log entry.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    pub user_id: i64,
    pub activity_type: ActivityType,
    pub activity_status: ActivityStatus,
    pub entity_id: Option<i64>,
    pub detail: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Create builder for fluent API
    pub fn builder(user_id: i64, activity_type: ActivityType) -> ActivityLogBuilder {
        ActivityLogBuilder::new(user_id, activity_type)
    }
}

pub struct ActivityLogBuilder {
    log: ActivityLog,
}

impl ActivityLogBuilder {
    pub fn new(user_id: i64, activity_type: ActivityType) -> Self {
        Self {
            log: ActivityLog {
                user_id,
                activity_type,
                activity_status: ActivityStatus::Success,
                entity_id: None,
                detail: None,
                error_message: None,
                created_at: Utc::now(),
            },
        }
    }

    pub fn status(mut self, status: ActivityStatus) -> Self {
        self.log.activity_status = status;
        self
    }

    pub fn entity_id(mut self, id: i64) -> Self {
        self.log.entity_id = Some(id);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.log.detail = Some(detail.into());
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.log.error_message = Some(message.into());
        self.log.activity_status = ActivityStatus::Error;
        self
    }

    pub fn build(self) -> ActivityLog {
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_success() {
        let log = ActivityLog::builder(1, ActivityType::OrderPlaced).build();
        assert_eq!(log.activity_status.as_str(), "success");
        assert!(log.entity_id.is_none());
    }

    #[test]
    fn error_sets_message_and_status() {
        let log = ActivityLog::builder(1, ActivityType::OrderStatusChanged)
            .entity_id(42)
            .error("boom")
            .build();
        assert_eq!(log.activity_status.as_str(), "error");
        assert_eq!(log.error_message.as_deref(), Some("boom"));
        assert_eq!(log.entity_id, Some(42));
    }
}
