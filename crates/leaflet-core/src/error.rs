//! Error types for `leaflet-core`.
//!
//! Not-found and not-owned are one variant so ownership is never disclosed.

use thiserror::Error;

/// Uniform rejection for any bearer credential that did not resolve.
pub const INVALID_CREDENTIAL: &str = "invalid or revoked credential";
/// Uniform rejection for a missing or wrong share password.
pub const PASSWORD_REJECTED: &str = "password required or incorrect";
/// Uniform rejection for a failed login.
pub const INVALID_LOGIN: &str = "invalid credentials";

#[derive(Debug, Error)]
pub enum Error {
  #[error("{0}")]
  Validation(String),

  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("share has expired")]
  Expired,

  #[error("{0}")]
  Unauthorized(&'static str),

  #[error("crypto error: {0}")]
  Crypto(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }

  /// Box a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
