//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Delegates to the services for business logic
//! 3. Returns HTTP response (JSON, status code)

/// Card lifecycle endpoints
pub mod cards;
/// Liveness endpoint
pub mod health;
/// In-app notification feed endpoints
pub mod notifications;
/// Deposit/withdraw/transfer/history endpoints
pub mod transactions;
/// Registration endpoint
pub mod users;
/// Wallet read endpoint
pub mod wallets;
