//! Extractors whose rejections render through the error page.
//!
//! axum's own `Path` and `Form` reject with a bare text response; these
//! wrappers turn the rejection into [`AppError::BadRequest`] instead.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `axum::extract::Path` with an [`AppError`] rejection.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

/// `axum::Form` with an [`AppError`] rejection.
#[derive(FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct Form<T>(pub T);
