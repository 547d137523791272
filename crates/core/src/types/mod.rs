//! Core types for Sillage.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod rating;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{format_usd, round_money};
pub use rating::{Rating, RatingDistribution, RatingError, RatingSummary};
pub use status::*;
