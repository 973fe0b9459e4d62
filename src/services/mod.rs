//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! The ledger engine ([`ledger_service`]) and the pure card allocator
//! ([`allocator`]) are the heart of the system; the rest support them.

pub mod allocator;
pub mod card_service;
pub mod ledger_service;
pub mod notifier_service;
pub mod wallet_service;
