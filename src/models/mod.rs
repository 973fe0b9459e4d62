//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the API request/response types derived from them.

/// User and access-token models
pub mod user;
/// Wallet model (one per user)
pub mod wallet;
/// Virtual debit card model
pub mod card;
/// Append-only transaction log model
pub mod transaction;
/// In-app notification model and notifier gateway payloads
pub mod notification;
