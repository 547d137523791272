//! Sillage Core - Shared domain types.
//!
//! This crate provides the types and pure calculations shared by every
//! Sillage component:
//! - `storefront` - JSON API for catalog, cart, transactions and reviews
//! - `cli` - Command-line tools for migrations and demo data
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres`
//! feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, ratings, money and statuses
//! - [`totals`] - Cart total calculation (subtotal, tax, shipping)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod totals;
pub mod types;

pub use totals::CartTotals;
pub use types::*;
