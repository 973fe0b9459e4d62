//! Pocketbank - Main Application Entry Point
//!
//! REST API server for a mobile banking backend: wallets, virtual debit
//! cards, and money-movement transactions (deposit, withdraw, transfer)
//! with post-commit notification fan-out.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use pocketbank::{
    AppState, config, db, handlers, middleware, services::notifier_service::NotifierSettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    config
        .validate_notifier_url()
        .map_err(|err| anyhow::anyhow!("{err}"))?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let state = AppState {
        pool,
        notifier: NotifierSettings {
            url: config.notifier_url.clone(),
            secret: config.notifier_secret.clone(),
        },
    };

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Wallet
        .route("/api/v1/wallet", get(handlers::wallets::get_wallet))
        // Card lifecycle
        .route("/api/v1/cards", post(handlers::cards::create_card))
        .route("/api/v1/cards", get(handlers::cards::list_cards))
        .route(
            "/api/v1/cards/{id}/freeze",
            post(handlers::cards::freeze_card),
        )
        .route(
            "/api/v1/cards/{id}/unfreeze",
            post(handlers::cards::unfreeze_card),
        )
        .route("/api/v1/cards/{id}", delete(handlers::cards::delete_card))
        // Money movement
        .route(
            "/api/v1/transactions/deposit",
            post(handlers::transactions::deposit),
        )
        .route(
            "/api/v1/transactions/withdraw",
            post(handlers::transactions::withdraw),
        )
        .route(
            "/api/v1/transactions/transfer",
            post(handlers::transactions::transfer),
        )
        .route("/api/v1/transactions", get(handlers::transactions::history))
        .route(
            "/api/v1/transactions/{id}",
            get(handlers::transactions::get_transaction),
        )
        // In-app notifications
        .route(
            "/api/v1/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/{id}/read",
            post(handlers::notifications::mark_read),
        )
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Combine authenticated routes with public routes
    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/register", post(handlers::users::register))
        // Merge authenticated routes
        .merge(authenticated_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share application state with all handlers via State extraction
        .with_state(state);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    axum::serve(listener, app).await?;

    Ok(())
}
