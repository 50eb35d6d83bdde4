//! Public URL prefix for share links.
//!
//! Priority: `X-Base-URL`, then `X-Forwarded-Proto` + `X-Forwarded-Host`,
//! then the configured default. A trailing `/` is always trimmed.

use std::convert::Infallible;

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use leaflet_core::store::PublicationStore;

use crate::AppState;

pub const X_BASE_URL: &str = "x-base-url";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// The resolved prefix, e.g. `https://leaf.example`.
pub struct BaseUrl(pub String);

impl BaseUrl {
  /// `<base>/s/<id>`
  pub fn share_url(&self, share_id: impl std::fmt::Display) -> String {
    format!("{}/s/{share_id}", self.0)
  }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

pub fn derive(headers: &HeaderMap, fallback: &str) -> String {
  if let Some(explicit) = header(headers, X_BASE_URL) {
    return explicit.trim_end_matches('/').to_owned();
  }
  if let Some(host) = header(headers, X_FORWARDED_HOST) {
    let proto = header(headers, X_FORWARDED_PROTO).unwrap_or("http");
    return format!("{proto}://{}", host.trim_end_matches('/'));
  }
  fallback.trim_end_matches('/').to_owned()
}

impl<S> FromRequestParts<AppState<S>> for BaseUrl
where
  S: PublicationStore + 'static,
{
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    Ok(Self(derive(&parts.headers, &state.config.base_url)))
  }
}
