//! GeoArt web application library.
//!
//! Users share places (a name, a description, a location and a picture),
//! browse them on a map, like and comment on them. The binary in `main.rs`
//! wires this library to `PostgreSQL`, Sentry and a TCP listener; the test
//! suite drives the same router over in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
