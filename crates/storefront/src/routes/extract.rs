//! Request extractors whose rejections render as [`AppError`].
//!
//! axum's own `Json` and `Query` reject malformed input with plain-text
//! responses. These wrappers route the rejection through `AppError` so every
//! failure carries the JSON `{error, message}` body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query string parameters.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
