//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Sign-up and sign-in with argon2 password hashes
//! - `upload` - Picture storage (Cloudinary or local disk)

pub mod auth;
pub mod upload;
