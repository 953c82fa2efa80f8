//! Core types for GeoArt.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod geo;
pub mod id;
pub mod username;

pub use email::{Email, EmailError};
pub use geo::{GeoError, GeoPoint};
pub use id::*;
pub use username::{Username, UsernameError};
