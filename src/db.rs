//! Database connection pool, migrations, and the atomic-write scope.
//!
//! This module provides utilities for:
//! - Creating and managing a PostgreSQL connection pool
//! - Running database migrations automatically
//! - Wrapping multi-row mutations in a single database transaction

use futures::future::BoxFuture;
use sqlx::{PgConnection, Pool, Postgres};

use crate::error::AppError;

/// Type alias for PostgreSQL connection pool.
///
/// Instead of writing `Pool<Postgres>` everywhere, we can use `DbPool`.
pub type DbPool = Pool<Postgres>;

/// Create a new PostgreSQL connection pool.
///
/// A connection pool maintains multiple database connections that can be reused across HTTP requests which is much more efficient than opening a new connection for each request.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection string is invalid
/// - Cannot connect to PostgreSQL server
/// - Database authentication fails
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    sqlx::postgres::PgPoolOptions::new()
        // Limit concurrent connections
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Run database migrations from the `migrations/` directory.
///
/// Executes all SQL migration files in order. Migrations are tracked in a
/// special `_sqlx_migrations` table, so each migration runs only once.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    // The macro reads migrations at compile time from ./migrations directory
    sqlx::migrate!("./migrations").run(pool).await
}

/// Run a closure inside one database transaction, committing on success and
/// rolling back on any error.
///
/// Every ledger entry point (deposit, withdraw, transfer, card lifecycle,
/// registration) goes through this function, so the full write set of an
/// operation (wallet rows, card rows, transaction insert) is applied
/// all-or-nothing. A failure between any two writes rolls the whole
/// operation back; no code path performs a balance write outside this scope.
///
/// # Example
///
/// ```ignore
/// let tx = db::with_atomic_write(&pool, |conn| {
///     Box::pin(async move {
///         // reads and writes against `conn` commit or roll back together
///         Ok(record)
///     })
/// })
/// .await?;
/// ```
pub async fn with_atomic_write<T, F>(pool: &DbPool, op: F) -> Result<T, AppError>
where
    F: for<'c> FnOnce(&'c mut PgConnection) -> BoxFuture<'c, Result<T, AppError>>,
{
    let mut tx = pool.begin().await?;

    match op(&mut *tx).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            // Explicit rollback; dropping the transaction would also roll
            // back, but surfacing a rollback failure beats hiding it.
            tx.rollback().await?;
            Err(err)
        }
    }
}
