//! Bearer-auth extractor.
//!
//! The bearer string may be a session token or an API secret; which one is
//! decided by [`leaflet_core::credentials::Credentials::verify`].

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use leaflet_core::{account::Principal, store::PublicationStore};

use crate::{AppState, error::ApiError};

/// The caller behind a verified bearer credential.
pub struct Authenticated(pub Principal);

/// The credential part of an `Authorization: Bearer <credential>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let (scheme, credential) = value.split_once(' ')?;
  if !scheme.eq_ignore_ascii_case("bearer") {
    return None;
  }
  Some(credential.trim()).filter(|c| !c.is_empty())
}

impl<S> FromRequestParts<AppState<S>> for Authenticated
where
  S: PublicationStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let bearer = bearer_token(&parts.headers).ok_or_else(ApiError::invalid_credential)?;
    let principal = state.credentials.verify(bearer).await?;
    Ok(Authenticated(principal))
  }
}
