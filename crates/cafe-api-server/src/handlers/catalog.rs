use axum::{
    extract::{Extension, Multipart, Path, Query},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::database::{Category, CategoryWithCount, MenuItem, MenuItemWithCategory};
use crate::logging::{ActivityLog, ActivityLogger, ActivityType};
use crate::security::AccessPolicy;
use crate::services::{CatalogService, CategoryFields, MenuItemFields};
use crate::storage::ImageUpload;
use crate::utils::error::{ApiError, FieldError};

// ============ CATEGORIES ============

#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    pub active_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<CategoryWithCount>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub actor_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub actor_id: i64,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

pub async fn list_categories_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Query(query): Query<ListCategoriesQuery>,
) -> Result<Json<CategoriesResponse>, ApiError> {
    let categories = catalog_service
        .list_categories(query.active_only.unwrap_or(false))
        .await?;
    let total = categories.len();

    Ok(Json(CategoriesResponse { categories, total }))
}

pub async fn create_category_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Json(request): Json<CategoryRequest>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    info!("Create category request from user {}", request.actor_id);

    let actor = access_policy.resolve_actor(request.actor_id).await?;
    let category = catalog_service
        .create_category(
            &actor,
            CategoryFields {
                name: request.name,
                description: request.description,
                is_active: request.is_active.unwrap_or(true),
                sort_order: request.sort_order.unwrap_or(0),
            },
        )
        .await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::CategoryCreated)
            .entity_id(category.id)
            .detail(format!("category '{}'", category.name))
            .build(),
    );

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Path(id): Path<i64>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<Category>, ApiError> {
    info!("Update category {} request from user {}", id, request.actor_id);

    let actor = access_policy.resolve_actor(request.actor_id).await?;
    let category = catalog_service
        .update_category(
            &actor,
            id,
            CategoryFields {
                name: request.name,
                description: request.description,
                is_active: request.is_active.unwrap_or(true),
                sort_order: request.sort_order.unwrap_or(0),
            },
        )
        .await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::CategoryUpdated)
            .entity_id(category.id)
            .detail(format!("category '{}'", category.name))
            .build(),
    );

    Ok(Json(category))
}

pub async fn delete_category_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Path(id): Path<i64>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    info!("Delete category {} request from user {}", id, query.actor_id);

    let actor = access_policy.resolve_actor(query.actor_id).await?;
    catalog_service.delete_category(&actor, id).await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::CategoryDeleted)
            .entity_id(id)
            .build(),
    );

    Ok(Json(DeleteResponse {
        success: true,
        message: "Category deleted successfully".to_string(),
    }))
}

// ============ MENU ITEMS ============

#[derive(Debug, Deserialize)]
pub struct ListMenuQuery {
    pub available_only: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MenuResponse {
    pub menu_items: Vec<MenuItemWithCategory>,
    pub total: usize,
}

#[derive(Debug, Default)]
struct MenuItemForm {
    actor_id: Option<i64>,
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    category_id: Option<i64>,
    is_available: Option<bool>,
    image: Option<ImageUpload>,
}

/// Parse the menu item multipart form (text fields plus an optional image
/// file).
async fn parse_menu_item_form(mut multipart: Multipart) -> Result<MenuItemForm, ApiError> {
    let mut form = MenuItemForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "actor_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid actor_id: {}", e)))?;
                form.actor_id = Some(
                    text.parse()
                        .map_err(|_| ApiError::BadRequest("actor_id must be integer".to_string()))?,
                );
            }
            "name" => {
                form.name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Invalid name: {}", e)))?,
                );
            }
            "description" => {
                form.description = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Invalid description: {}", e)))?,
                );
            }
            "price" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid price: {}", e)))?;
                form.price = Some(
                    text.parse()
                        .map_err(|_| ApiError::validation("price", "must be a decimal number"))?,
                );
            }
            "category_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid category_id: {}", e)))?;
                form.category_id = Some(
                    text.parse()
                        .map_err(|_| ApiError::validation("category_id", "must be an integer"))?,
                );
            }
            "is_available" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid is_available: {}", e)))?;
                form.is_available = Some(matches!(text.as_str(), "1" | "true" | "on"));
            }
            "image" => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ApiError::BadRequest("image filename required".to_string()))?;
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read image: {}", e)))?
                    .to_vec();
                form.image = Some(ImageUpload { filename, bytes });
            }
            _ => {}
        }
    }

    Ok(form)
}

impl MenuItemForm {
    fn into_parts(self) -> Result<(i64, MenuItemFields, Option<ImageUpload>), ApiError> {
        let actor_id = self
            .actor_id
            .ok_or_else(|| ApiError::BadRequest("actor_id required".to_string()))?;

        let mut errors = Vec::new();
        if self.price.is_none() {
            errors.push(FieldError::new("price", "is required"));
        }
        if self.category_id.is_none() {
            errors.push(FieldError::new("category_id", "is required"));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let fields = MenuItemFields {
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            price: self.price.unwrap_or_default(),
            category_id: self.category_id.unwrap_or_default(),
            is_available: self.is_available,
        };

        Ok((actor_id, fields, self.image))
    }
}

pub async fn list_menu_items_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Query(query): Query<ListMenuQuery>,
) -> Result<Json<MenuResponse>, ApiError> {
    let menu_items = catalog_service
        .list_menu_items(query.available_only.unwrap_or(false))
        .await?;
    let total = menu_items.len();

    Ok(Json(MenuResponse { menu_items, total }))
}

pub async fn create_menu_item_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<MenuItem>), ApiError> {
    let form = parse_menu_item_form(multipart).await?;
    let (actor_id, fields, image) = form.into_parts()?;

    info!("Create menu item request from user {}", actor_id);

    let actor = access_policy.resolve_actor(actor_id).await?;
    let item = catalog_service
        .create_menu_item(&actor, fields, image)
        .await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::MenuItemCreated)
            .entity_id(item.id)
            .detail(format!("menu item '{}'", item.name))
            .build(),
    );

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_menu_item_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<MenuItem>, ApiError> {
    let form = parse_menu_item_form(multipart).await?;
    let (actor_id, fields, image) = form.into_parts()?;

    info!("Update menu item {} request from user {}", id, actor_id);

    let actor = access_policy.resolve_actor(actor_id).await?;
    let item = catalog_service
        .update_menu_item(&actor, id, fields, image)
        .await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::MenuItemUpdated)
            .entity_id(item.id)
            .detail(format!("menu item '{}'", item.name))
            .build(),
    );

    Ok(Json(item))
}

pub async fn delete_menu_item_handler(
    Extension(catalog_service): Extension<Arc<CatalogService>>,
    Extension(access_policy): Extension<Arc<AccessPolicy>>,
    Extension(activity_logger): Extension<ActivityLogger>,
    Path(id): Path<i64>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    info!("Delete menu item {} request from user {}", id, query.actor_id);

    let actor = access_policy.resolve_actor(query.actor_id).await?;
    catalog_service.delete_menu_item(&actor, id).await?;

    activity_logger.log(
        ActivityLog::builder(actor.id, ActivityType::MenuItemDeleted)
            .entity_id(id)
            .build(),
    );

    Ok(Json(DeleteResponse {
        success: true,
        message: "Menu item deleted successfully".to_string(),
    }))
}
