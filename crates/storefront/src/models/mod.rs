//! Domain models for the storefront.
//!
//! These types represent validated domain objects separate from database row
//! types. Line items come in two deliberately distinct shapes:
//!
//! - [`cart::CartLineRef`] - a live reference to a catalog product
//! - [`transaction::OrderLineSnapshot`] - an immutable copy of product data
//!   frozen when the order was placed

pub mod cart;
pub mod product;
pub mod review;
pub mod transaction;

pub use cart::{Cart, CartError, CartLineRef};
pub use product::{Product, ProductDetails};
pub use review::{NewReview, Review, ReviewSort};
pub use transaction::{
    LedgerSummary, NewTransaction, OrderLineSnapshot, OrderTotals, StatusChange, Transaction,
    TransactionQuery,
};
