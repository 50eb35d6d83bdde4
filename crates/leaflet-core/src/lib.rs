//! Core types, the store trait and the publication engine for Leaflet.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! storage backend (`leaflet-store-sqlite`) and the HTTP layer
//! (`leaflet-api`) both depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod account;
pub mod accounts;
pub mod clock;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod lifecycle;
pub mod references;
pub mod session;
pub mod share;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod testing;
