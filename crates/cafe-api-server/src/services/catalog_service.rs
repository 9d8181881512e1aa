use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::{Category, CategoryWithCount, MenuItem, MenuItemWithCategory, Repository};
use crate::security::{AccessPolicy, Actor};
use crate::storage::{ImageStore, ImageUpload};
use crate::utils::error::{ApiError, FieldError};

const MAX_NAME_LENGTH: usize = 255;

/// Writable fields of a category. Updates replace the full set, matching the
/// admin form.
#[derive(Debug, Clone)]
pub struct CategoryFields {
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
}

/// Writable fields of a menu item. `is_available = None` keeps the stored
/// value on update and defaults to available on create.
#[derive(Debug, Clone)]
pub struct MenuItemFields {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: i64,
    pub is_available: Option<bool>,
}

/// Category and menu item management.
pub struct CatalogService {
    repository: Arc<Repository>,
    image_store: Arc<dyn ImageStore>,
}

impl CatalogService {
    pub fn new(repository: Arc<Repository>, image_store: Arc<dyn ImageStore>) -> Self {
        Self {
            repository,
            image_store,
        }
    }

    // ============ CATEGORIES ============

    pub async fn create_category(
        &self,
        actor: &Actor,
        fields: CategoryFields,
    ) -> Result<Category, ApiError> {
        AccessPolicy::require_admin(actor)?;

        let mut errors = validate_category_fields(&fields.name, fields.sort_order);
        if errors.is_empty()
            && self
                .repository
                .category_name_exists(&fields.name, None)
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        {
            errors.push(FieldError::new("name", "has already been taken"));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let category = self
            .repository
            .insert_category(
                &fields.name,
                fields.description.as_deref(),
                fields.is_active,
                fields.sort_order,
            )
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!("Category {} created by user {}", category.id, actor.id);

        Ok(category)
    }

    pub async fn update_category(
        &self,
        actor: &Actor,
        id: i64,
        fields: CategoryFields,
    ) -> Result<Category, ApiError> {
        AccessPolicy::require_admin(actor)?;

        self.repository
            .get_category(id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Category {} not found", id)))?;

        let mut errors = validate_category_fields(&fields.name, fields.sort_order);
        if errors.is_empty()
            && self
                .repository
                .category_name_exists(&fields.name, Some(id))
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        {
            errors.push(FieldError::new("name", "has already been taken"));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let category = self
            .repository
            .update_category(
                id,
                &fields.name,
                fields.description.as_deref(),
                fields.is_active,
                fields.sort_order,
            )
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Category {} not found", id)))?;

        info!("Category {} updated by user {}", id, actor.id);

        Ok(category)
    }

    /// Delete a category. Refused while any menu item still references it.
    pub async fn delete_category(&self, actor: &Actor, id: i64) -> Result<(), ApiError> {
        AccessPolicy::require_admin(actor)?;

        self.repository
            .get_category(id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Category {} not found", id)))?;

        let referencing = self
            .repository
            .menu_item_count_for_category(id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        if referencing > 0 {
            return Err(ApiError::Conflict(
                "Cannot delete category with existing menu items".to_string(),
            ));
        }

        self.repository
            .delete_category(id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!("Category {} deleted by user {}", id, actor.id);

        Ok(())
    }

    pub async fn list_categories(
        &self,
        active_only: bool,
    ) -> Result<Vec<CategoryWithCount>, ApiError> {
        self.repository
            .list_categories(active_only)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }

    // ============ MENU ITEMS ============

    pub async fn create_menu_item(
        &self,
        actor: &Actor,
        fields: MenuItemFields,
        image: Option<ImageUpload>,
    ) -> Result<MenuItem, ApiError> {
        AccessPolicy::require_admin(actor)?;

        let mut errors =
            validate_menu_item_fields(&fields.name, &fields.description, fields.price);
        if !self
            .repository
            .category_exists(fields.category_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        {
            errors.push(FieldError::new(
                "category_id",
                "selected category does not exist",
            ));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let image_path = resolve_image(self.image_store.as_ref(), image.as_ref()).await?;

        let item = self
            .repository
            .insert_menu_item(
                &fields.name,
                &fields.description,
                fields.price,
                fields.category_id,
                fields.is_available.unwrap_or(true),
                &image_path,
            )
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

        info!("Menu item {} created by user {}", item.id, actor.id);

        Ok(item)
    }

    pub async fn update_menu_item(
        &self,
        actor: &Actor,
        id: i64,
        fields: MenuItemFields,
        image: Option<ImageUpload>,
    ) -> Result<MenuItem, ApiError> {
        AccessPolicy::require_admin(actor)?;

        let existing = self
            .repository
            .get_menu_item(id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Menu item {} not found", id)))?;

        let mut errors =
            validate_menu_item_fields(&fields.name, &fields.description, fields.price);
        if !self
            .repository
            .category_exists(fields.category_id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
        {
            errors.push(FieldError::new(
                "category_id",
                "selected category does not exist",
            ));
        }
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let image_path = match image {
            Some(ref upload) => {
                let stored = resolve_image(self.image_store.as_ref(), Some(upload)).await?;
                release_replaced_image(self.image_store.as_ref(), &existing.image).await;
                stored
            }
            None => existing.image.clone(),
        };

        let item = self
            .repository
            .update_menu_item(
                id,
                &fields.name,
                &fields.description,
                fields.price,
                fields.category_id,
                fields.is_available.unwrap_or(existing.is_available),
                &image_path,
            )
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?
            .ok_or_else(|| ApiError::NotFound(format!("Menu item {} not found", id)))?;

        info!("Menu item {} updated by user {}", id, actor.id);

        Ok(item)
    }

    /// Delete a menu item. Unconditional: nothing references menu items.
    pub async fn delete_menu_item(&self, actor: &Actor, id: i64) -> Result<(), ApiError> {
        AccessPolicy::require_admin(actor)?;

        let deleted = self
            .repository
            .delete_menu_item(id)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        if !deleted {
            return Err(ApiError::NotFound(format!("Menu item {} not found", id)));
        }

        info!("Menu item {} deleted by user {}", id, actor.id);

        Ok(())
    }

    pub async fn list_menu_items(
        &self,
        available_only: bool,
    ) -> Result<Vec<MenuItemWithCategory>, ApiError> {
        self.repository
            .list_menu_items(available_only)
            .await
            .map_err(|e| ApiError::DatabaseError(e.to_string()))
    }
}

fn validate_category_fields(name: &str, sort_order: i32) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    } else if name.len() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("must not exceed {} characters", MAX_NAME_LENGTH),
        ));
    }
    if sort_order < 0 {
        errors.push(FieldError::new("sort_order", "must be at least 0"));
    }

    errors
}

fn validate_menu_item_fields(name: &str, description: &str, price: Decimal) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if name.trim().is_empty() {
        errors.push(FieldError::new("name", "must not be empty"));
    } else if name.len() > MAX_NAME_LENGTH {
        errors.push(FieldError::new(
            "name",
            format!("must not exceed {} characters", MAX_NAME_LENGTH),
        ));
    }
    if description.trim().is_empty() {
        errors.push(FieldError::new("description", "must not be empty"));
    }
    if price < Decimal::ZERO {
        errors.push(FieldError::new("price", "must be at least 0"));
    }

    errors
}

/// Validate the upload's file type and return its normalized extension.
fn image_extension(filename: &str) -> Result<String, ApiError> {
    let guess = mime_guess::from_path(filename).first_or_octet_stream();
    let allowed = guess.type_() == mime_guess::mime::IMAGE
        && matches!(guess.subtype().as_str(), "jpeg" | "png" | "gif");
    if !allowed {
        return Err(ApiError::validation(
            "image",
            "must be a jpeg, png or gif image",
        ));
    }

    let extension = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    Ok(extension)
}

/// Store the upload, or fall back to the placeholder path when absent.
async fn resolve_image(
    store: &dyn ImageStore,
    upload: Option<&ImageUpload>,
) -> Result<String, ApiError> {
    match upload {
        Some(upload) => {
            let extension = image_extension(&upload.filename)?;
            store.store(&upload.bytes, &extension).await
        }
        None => Ok(store.placeholder().to_string()),
    }
}

/// Delete a replaced image from the store. The placeholder is shared across
/// items and never released. Failures are logged, not surfaced: the new
/// image is already in place.
async fn release_replaced_image(store: &dyn ImageStore, previous: &str) {
    if previous == store.placeholder() {
        return;
    }
    if store.exists(previous).await {
        if let Err(e) = store.delete(previous).await {
            warn!("Failed to delete replaced image {}: {}", previous, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockImageStore;
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn negative_price_is_rejected_zero_is_not() {
        let errors = validate_menu_item_fields("Espresso", "Single shot", dec("-0.01"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "price");

        let errors = validate_menu_item_fields("Espresso", "Single shot", dec("0"));
        assert!(errors.is_empty());
    }

    #[test]
    fn blank_name_and_description_are_rejected() {
        let errors = validate_menu_item_fields("  ", "", dec("3.50"));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "description"]);
    }

    #[test]
    fn category_name_length_limit_is_enforced() {
        let long_name = "x".repeat(MAX_NAME_LENGTH + 1);
        let errors = validate_category_fields(&long_name, 0);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");

        let max_name = "x".repeat(MAX_NAME_LENGTH);
        assert!(validate_category_fields(&max_name, 0).is_empty());
    }

    #[test]
    fn negative_sort_order_is_rejected() {
        let errors = validate_category_fields("Coffee", -1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sort_order");
    }

    #[test]
    fn image_extension_accepts_the_allowed_types() {
        assert_eq!(image_extension("latte.png").unwrap(), "png");
        assert_eq!(image_extension("latte.JPG").unwrap(), "jpg");
        assert_eq!(image_extension("latte.jpeg").unwrap(), "jpeg");
        assert_eq!(image_extension("latte.gif").unwrap(), "gif");
    }

    #[test]
    fn image_extension_rejects_other_types() {
        for filename in ["menu.pdf", "item.bmp", "noextension", "script.sh"] {
            match image_extension(filename) {
                Err(ApiError::Validation(_)) => {}
                other => panic!("expected Validation for {:?}, got {:?}", filename, other),
            }
        }
    }

    #[tokio::test]
    async fn resolve_image_falls_back_to_placeholder() {
        let mut store = MockImageStore::new();
        store
            .expect_placeholder()
            .return_const("menu-items/placeholder.png".to_string());

        let path = resolve_image(&store, None).await.unwrap();
        assert_eq!(path, "menu-items/placeholder.png");
    }

    #[tokio::test]
    async fn resolve_image_stores_the_upload() {
        let mut store = MockImageStore::new();
        store
            .expect_store()
            .withf(|_, extension| extension == "png")
            .times(1)
            .returning(|_, _| Ok("menu-items/stored.png".to_string()));

        let upload = ImageUpload {
            filename: "latte.png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let path = resolve_image(&store, Some(&upload)).await.unwrap();
        assert_eq!(path, "menu-items/stored.png");
    }

    #[tokio::test]
    async fn replaced_placeholder_is_never_released() {
        let mut store = MockImageStore::new();
        store
            .expect_placeholder()
            .return_const("menu-items/placeholder.png".to_string());
        store.expect_delete().times(0);

        release_replaced_image(&store, "menu-items/placeholder.png").await;
    }

    #[tokio::test]
    async fn replaced_real_image_is_released() {
        let mut store = MockImageStore::new();
        store
            .expect_placeholder()
            .return_const("menu-items/placeholder.png".to_string());
        store
            .expect_exists()
            .withf(|path| path == "menu-items/old.png")
            .returning(|_| true);
        store
            .expect_delete()
            .withf(|path| path == "menu-items/old.png")
            .times(1)
            .returning(|_| Ok(()));

        release_replaced_image(&store, "menu-items/old.png").await;
    }
}
