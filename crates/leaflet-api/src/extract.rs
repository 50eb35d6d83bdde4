//! Body and query extractors that reject with [`ApiError`] instead of
//! axum's plain-text responses.

use axum::{
  Json,
  extract::{FromRequest, FromRequestParts, Query},
};

use crate::error::ApiError;

/// [`Json`] whose rejection is a `{"error": ..}` 400.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

/// [`Query`] whose rejection is a `{"error": ..}` 400.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub struct QueryParams<T>(pub T);

/// Reads an optional `u32`. Values that do not parse, such as `-1`, are
/// treated as absent.
pub(crate) fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
  D: serde::Deserializer<'de>,
{
  let raw: Option<String> = serde::Deserialize::deserialize(deserializer)?;
  Ok(raw.and_then(|s| s.trim().parse().ok()))
}
