use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Extension, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use cafe_api_server::config::Settings;
use cafe_api_server::database::{DbPool, Repository};
use cafe_api_server::handlers;
use cafe_api_server::logging::{ActivityLogger, LoggerConfig};
use cafe_api_server::security::AccessPolicy;
use cafe_api_server::services::{CatalogService, OrderService, RoleService};
use cafe_api_server::storage::{ImageStore, LocalImageStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cafe_api_server=debug".to_string()),
        )
        .with_target(true)
        .json()
        .init();

    info!("🚀 Starting Cafe API Server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Initialize database pool
    let db_pool = DbPool::new(&settings.database).await?;
    info!("✅ Database connection established");

    // Initialize repository and schema
    let repository = Arc::new(Repository::new(db_pool.clone()));
    repository.ensure_schema().await?;
    if settings.server.seed_demo_data {
        repository
            .seed_demo_data(&settings.storage.placeholder_image)
            .await?;
    }
    info!("✅ Schema ensured");

    // Initialize blob storage
    let image_store: Arc<dyn ImageStore> = Arc::new(LocalImageStore::new(&settings.storage)?);

    // Initialize services
    let access_policy = Arc::new(AccessPolicy::new(repository.clone()));
    let catalog_service = Arc::new(CatalogService::new(
        repository.clone(),
        image_store.clone(),
    ));
    let order_service = Arc::new(OrderService::new(repository.clone()));
    let role_service = Arc::new(RoleService::new(repository.clone()));

    // Initialize activity logger
    let activity_logger = ActivityLogger::new(db_pool.get_pool().clone(), LoggerConfig::default());

    // Build router
    let app = build_router(
        repository,
        catalog_service,
        order_service,
        role_service,
        access_policy,
        activity_logger,
    );

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));

    info!("🎯 Server listening on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(
    repository: Arc<Repository>,
    catalog_service: Arc<CatalogService>,
    order_service: Arc<OrderService>,
    role_service: Arc<RoleService>,
    access_policy: Arc<AccessPolicy>,
    activity_logger: ActivityLogger,
) -> Router {
    // Public routes (no actor resolution)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check));

    // API routes
    let api_routes = Router::new()
        .route(
            "/api/categories",
            get(handlers::catalog::list_categories_handler)
                .post(handlers::catalog::create_category_handler),
        )
        .route(
            "/api/categories/{id}",
            put(handlers::catalog::update_category_handler)
                .delete(handlers::catalog::delete_category_handler),
        )
        .route(
            "/api/menu",
            get(handlers::catalog::list_menu_items_handler)
                .post(handlers::catalog::create_menu_item_handler),
        )
        .route(
            "/api/menu/{id}",
            put(handlers::catalog::update_menu_item_handler)
                .delete(handlers::catalog::delete_menu_item_handler),
        )
        .route(
            "/api/orders",
            get(handlers::orders::list_orders_handler).post(handlers::orders::place_order_handler),
        )
        .route(
            "/api/orders/{id}/status",
            put(handlers::orders::update_order_status_handler),
        )
        .route("/api/roles", get(handlers::roles::list_roles_handler))
        .route("/api/users", get(handlers::roles::list_users_handler))
        .route(
            "/api/users/{id}/role",
            put(handlers::roles::update_user_role_handler),
        );

    // Combine routes
    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        // Shared state
        .layer(Extension(repository))
        .layer(Extension(catalog_service))
        .layer(Extension(order_service))
        .layer(Extension(role_service))
        .layer(Extension(access_policy))
        .layer(Extension(activity_logger))
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        // Body limit (image uploads - max 5MB)
        .layer(DefaultBodyLimit::max(5 * 1024 * 1024))
}
