//! Business logic for the storefront.
//!
//! Services borrow the shared stores and collaborators from
//! [`AppState`](crate::state::AppState) and are constructed per request.
//!
//! # Services
//!
//! - `catalog` - Product CRUD and image lifecycle
//! - `cart` - Cart mutations and the priced cart view
//! - `transactions` - Order ledger, checkout and status transitions
//! - `reviews` - Purchase-gated reviews, listing and stats
//!
//! Supporting modules: `eligibility`, `rating` (aggregation), `profanity`,
//! `images`, `receipt`, `email` and `notifications`.

pub mod cart;
pub mod catalog;
pub mod eligibility;
pub mod email;
pub mod images;
pub mod notifications;
pub mod profanity;
pub mod rating;
pub mod receipt;
pub mod reviews;
pub mod transactions;
