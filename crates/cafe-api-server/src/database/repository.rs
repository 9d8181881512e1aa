use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::types::Json;
use tracing::{debug, info};

use super::models::{
    Category, CategoryWithCount, LineItem, MenuItem, MenuItemWithCategory, Order, OrderWithUser,
    Role, UserWithRole,
};
use super::DbPool;

pub struct Repository {
    pub pool: DbPool,
}

impl Repository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Cheap connectivity probe for the readiness endpoint.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(self.pool.get_pool()).await?;
        Ok(())
    }

    // ============ SCHEMA ============

    /// Create tables and indexes if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        let pool = self.pool.get_pool();

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS roles (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(50) NOT NULL UNIQUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL UNIQUE,
                role_id BIGINT NOT NULL REFERENCES roles(id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS categories (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                description TEXT,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                sort_order INT NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS menu_items (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                description TEXT NOT NULL,
                price NUMERIC(10, 2) NOT NULL CHECK (price >= 0),
                category_id BIGINT NOT NULL REFERENCES categories(id),
                is_available BOOLEAN NOT NULL DEFAULT TRUE,
                image VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS orders (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL REFERENCES users(id),
                items JSONB NOT NULL,
                total_amount NUMERIC(10, 2) NOT NULL,
                status VARCHAR(20) NOT NULL DEFAULT 'pending',
                notes TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS activity_logs (
                id BIGSERIAL PRIMARY KEY,
                user_id BIGINT NOT NULL,
                activity_type VARCHAR(50) NOT NULL,
                activity_status VARCHAR(20) NOT NULL,
                entity_id BIGINT,
                detail TEXT,
                error_message TEXT,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )"#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_menu_items_category ON menu_items(category_id)",
        )
        .execute(pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_created ON orders(created_at DESC)")
            .execute(pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_activity_logs_user ON activity_logs(user_id)")
            .execute(pool)
            .await?;

        debug!("Schema ensured");
        Ok(())
    }

    /// Seed roles, two demo accounts and the default catalog. Roles and users
    /// are idempotent; the catalog is only seeded while empty.
    pub async fn seed_demo_data(&self, placeholder_image: &str) -> Result<()> {
        let pool = self.pool.get_pool();

        for role in ["admin", "user"] {
            sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
                .bind(role)
                .execute(pool)
                .await?;
        }

        let demo_users = [
            ("Admin", "admin@example.com", "admin"),
            ("Demo Customer", "customer@example.com", "user"),
        ];
        for (name, email, role) in demo_users {
            sqlx::query(
                r#"INSERT INTO users (name, email, role_id)
                   SELECT $1::VARCHAR, $2::VARCHAR, r.id FROM roles r WHERE r.name = $3
                   ON CONFLICT (email) DO NOTHING"#,
            )
            .bind(name)
            .bind(email)
            .bind(role)
            .execute(pool)
            .await?;
        }

        let category_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(pool)
            .await?;
        if category_count > 0 {
            debug!("Catalog already populated, skipping seed");
            return Ok(());
        }

        let categories = [
            ("Coffee", "Hot and cold coffee beverages", 1),
            ("Pastries", "Fresh baked goods and desserts", 2),
            ("Beverages", "Non-coffee drinks and refreshments", 3),
        ];
        for (name, description, sort_order) in categories {
            sqlx::query(
                r#"INSERT INTO categories (name, description, is_active, sort_order)
                   VALUES ($1, $2, TRUE, $3)
                   ON CONFLICT (name) DO NOTHING"#,
            )
            .bind(name)
            .bind(description)
            .bind(sort_order)
            .execute(pool)
            .await?;
        }

        // (name, description, price in cents, category)
        let menu_items: [(&str, &str, i64, &str); 9] = [
            ("Espresso", "Rich and bold single shot", 350, "Coffee"),
            ("Americano", "Espresso with hot water", 300, "Coffee"),
            ("Latte", "Espresso with steamed milk", 450, "Coffee"),
            ("Cappuccino", "Espresso with steamed milk and foam", 400, "Coffee"),
            ("Mocha", "Chocolate and espresso with milk", 500, "Coffee"),
            ("Croissant", "Buttery and flaky pastry", 400, "Pastries"),
            ("Muffin", "Freshly baked blueberry muffin", 325, "Pastries"),
            ("Bagel", "Toasted bagel with cream cheese", 350, "Pastries"),
            ("Orange Juice", "Freshly squeezed orange juice", 375, "Beverages"),
        ];
        for (name, description, cents, category) in menu_items {
            sqlx::query(
                r#"INSERT INTO menu_items (name, description, price, category_id, is_available, image)
                   SELECT $1::VARCHAR, $2::TEXT, $3::NUMERIC, c.id, TRUE, $4::VARCHAR
                   FROM categories c WHERE c.name = $5"#,
            )
            .bind(name)
            .bind(description)
            .bind(Decimal::new(cents, 2))
            .bind(placeholder_image)
            .bind(category)
            .execute(pool)
            .await?;
        }

        info!("Seeded demo catalog ({} menu items)", menu_items.len());
        Ok(())
    }

    // ============ CATEGORIES ============

    pub async fn insert_category(
        &self,
        name: &str,
        description: Option<&str>,
        is_active: bool,
        sort_order: i32,
    ) -> Result<Category> {
        let category = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (name, description, is_active, sort_order)
               VALUES ($1, $2, $3, $4)
               RETURNING id, name, description, is_active, sort_order, created_at, updated_at"#,
        )
        .bind(name)
        .bind(description)
        .bind(is_active)
        .bind(sort_order)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(category)
    }

    pub async fn update_category(
        &self,
        id: i64,
        name: &str,
        description: Option<&str>,
        is_active: bool,
        sort_order: i32,
    ) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"UPDATE categories
               SET name = $2, description = $3, is_active = $4, sort_order = $5,
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, description, is_active, sort_order, created_at, updated_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(is_active)
        .bind(sort_order)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(category)
    }

    pub async fn delete_category(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            r#"SELECT id, name, description, is_active, sort_order, created_at, updated_at
               FROM categories WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(category)
    }

    pub async fn category_exists(&self, id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(exists)
    }

    /// Case-insensitive name uniqueness check. `exclude_id` leaves the record
    /// being updated out of the comparison.
    pub async fn category_name_exists(&self, name: &str, exclude_id: Option<i64>) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"SELECT EXISTS(
                   SELECT 1 FROM categories
                   WHERE LOWER(name) = LOWER($1)
                     AND ($2::BIGINT IS NULL OR id <> $2)
               )"#,
        )
        .bind(name)
        .bind(exclude_id)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(exists)
    }

    pub async fn menu_item_count_for_category(&self, category_id: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM menu_items WHERE category_id = $1")
                .bind(category_id)
                .fetch_one(self.pool.get_pool())
                .await?;

        Ok(count)
    }

    /// Categories ordered by sort order then name, each with its referencing
    /// menu item count. Recomputed per call.
    pub async fn list_categories(&self, active_only: bool) -> Result<Vec<CategoryWithCount>> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(
            r#"SELECT
                c.id,
                c.name,
                c.description,
                c.is_active,
                c.sort_order,
                COUNT(m.id) AS menu_items_count,
                c.created_at,
                c.updated_at
               FROM categories c
               LEFT JOIN menu_items m ON m.category_id = c.id
               WHERE ($1 = FALSE OR c.is_active = TRUE)
               GROUP BY c.id
               ORDER BY c.sort_order, c.name"#,
        )
        .bind(active_only)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(categories)
    }

    // ============ MENU ITEMS ============

    pub async fn insert_menu_item(
        &self,
        name: &str,
        description: &str,
        price: Decimal,
        category_id: i64,
        is_available: bool,
        image: &str,
    ) -> Result<MenuItem> {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"INSERT INTO menu_items (name, description, price, category_id, is_available, image)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING id, name, description, price, category_id, is_available, image,
                         created_at, updated_at"#,
        )
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category_id)
        .bind(is_available)
        .bind(image)
        .fetch_one(self.pool.get_pool())
        .await?;

        Ok(item)
    }

    pub async fn update_menu_item(
        &self,
        id: i64,
        name: &str,
        description: &str,
        price: Decimal,
        category_id: i64,
        is_available: bool,
        image: &str,
    ) -> Result<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"UPDATE menu_items
               SET name = $2, description = $3, price = $4, category_id = $5,
                   is_available = $6, image = $7, updated_at = NOW()
               WHERE id = $1
               RETURNING id, name, description, price, category_id, is_available, image,
                         created_at, updated_at"#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(category_id)
        .bind(is_available)
        .bind(image)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(item)
    }

    pub async fn delete_menu_item(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = $1")
            .bind(id)
            .execute(self.pool.get_pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_menu_item(&self, id: i64) -> Result<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(
            r#"SELECT id, name, description, price, category_id, is_available, image,
                      created_at, updated_at
               FROM menu_items WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(item)
    }

    /// Menu items ordered by name, joined with their category name.
    pub async fn list_menu_items(&self, available_only: bool) -> Result<Vec<MenuItemWithCategory>> {
        let items = sqlx::query_as::<_, MenuItemWithCategory>(
            r#"SELECT
                m.id,
                m.name,
                m.description,
                m.price,
                m.category_id,
                c.name AS category_name,
                m.is_available,
                m.image,
                m.created_at,
                m.updated_at
               FROM menu_items m
               JOIN categories c ON c.id = m.category_id
               WHERE ($1 = FALSE OR m.is_available = TRUE)
               ORDER BY m.name"#,
        )
        .bind(available_only)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(items)
    }

    // ============ ORDERS ============

    pub async fn insert_order(
        &self,
        user_id: i64,
        items: &[LineItem],
        total_amount: Decimal,
        notes: Option<&str>,
    ) -> Result<Order> {
        let order = sqlx::query_as::<_, Order>(
            r#"INSERT INTO orders (user_id, items, total_amount, status, notes)
               VALUES ($1, $2, $3, 'pending', $4)
               RETURNING id, user_id, items, total_amount, status, notes, created_at, updated_at"#,
        )
        .bind(user_id)
        .bind(Json(items))
        .bind(total_amount)
        .bind(notes)
        .fetch_one(self.pool.get_pool())
        .await?;

        debug!("Created order {} for user {}", order.id, user_id);

        Ok(order)
    }

    pub async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"SELECT id, user_id, items, total_amount, status, notes, created_at, updated_at
               FROM orders WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(order)
    }

    pub async fn update_order_status(&self, id: i64, status: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"UPDATE orders
               SET status = $2, updated_at = NOW()
               WHERE id = $1
               RETURNING id, user_id, items, total_amount, status, notes, created_at, updated_at"#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(order)
    }

    /// All orders joined with their owning user, newest first.
    pub async fn list_all_orders(&self) -> Result<Vec<OrderWithUser>> {
        let orders = sqlx::query_as::<_, OrderWithUser>(
            r#"SELECT
                o.id,
                o.user_id,
                u.name AS user_name,
                u.email AS user_email,
                o.items,
                o.total_amount,
                o.status,
                o.notes,
                o.created_at,
                o.updated_at
               FROM orders o
               JOIN users u ON u.id = o.user_id
               ORDER BY o.created_at DESC"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(orders)
    }

    /// A user's own orders, newest first, optionally limited.
    pub async fn list_orders_for_user(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"SELECT id, user_id, items, total_amount, status, notes, created_at, updated_at
               FROM orders
               WHERE user_id = $1
               ORDER BY created_at DESC
               LIMIT $2"#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(orders)
    }

    // ============ USERS & ROLES ============

    pub async fn get_user_with_role(&self, user_id: i64) -> Result<Option<UserWithRole>> {
        let user = sqlx::query_as::<_, UserWithRole>(
            r#"SELECT u.id, u.name, u.email, u.role_id, r.name AS role_name, u.created_at
               FROM users u
               JOIN roles r ON r.id = u.role_id
               WHERE u.id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.get_pool())
        .await?;

        Ok(user)
    }

    pub async fn list_users_with_roles(&self) -> Result<Vec<UserWithRole>> {
        let users = sqlx::query_as::<_, UserWithRole>(
            r#"SELECT u.id, u.name, u.email, u.role_id, r.name AS role_name, u.created_at
               FROM users u
               JOIN roles r ON r.id = u.role_id
               ORDER BY u.name"#,
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(users)
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, created_at FROM roles ORDER BY id",
        )
        .fetch_all(self.pool.get_pool())
        .await?;

        Ok(roles)
    }

    pub async fn role_exists(&self, role_id: i64) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
                .bind(role_id)
                .fetch_one(self.pool.get_pool())
                .await?;

        Ok(exists)
    }

    pub async fn set_user_role(&self, user_id: i64, role_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET role_id = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(self.pool.get_pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
