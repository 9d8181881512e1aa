pub mod catalog_service;
pub mod order_service;
pub mod role_service;

pub use catalog_service::{CatalogService, CategoryFields, MenuItemFields};
pub use order_service::{OrderListing, OrderService};
pub use role_service::RoleService;
