//! Pocketbank - mobile banking ledger backend.
//!
//! Library crate exposing the ledger engine and its supporting modules so
//! integration tests and the server binary share one implementation.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: bearer tokens with SHA-256 hashing
//! - **Format**: JSON requests/responses
//!
//! The money-moving core lives in [`services::ledger_service`] (deposit,
//! withdraw, transfer, history) and [`services::allocator`] (pure card
//! allocation); everything else is thin glue around it.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use db::DbPool;
use services::notifier_service::NotifierSettings;

/// Shared state injected into every handler and middleware via Axum's
/// State extraction.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub pool: DbPool,

    /// Notifier gateway settings (in-app only when no gateway is configured)
    pub notifier: NotifierSettings,
}
