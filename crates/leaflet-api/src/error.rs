//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::rejection::{JsonRejection, QueryRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use leaflet_core::error::INVALID_CREDENTIAL;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error(transparent)]
  Core(#[from] leaflet_core::Error),
}

impl ApiError {
  /// The rejection for a missing, malformed or unresolvable bearer.
  pub fn invalid_credential() -> Self {
    Self::Core(leaflet_core::Error::Unauthorized(INVALID_CREDENTIAL))
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    use leaflet_core::Error as E;

    let (status, message) = match &self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Core(e) => match e {
        E::Validation(m) => (StatusCode::BAD_REQUEST, m.clone()),
        E::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
        E::Expired => (StatusCode::GONE, e.to_string()),
        E::Unauthorized(m) => (StatusCode::UNAUTHORIZED, (*m).to_owned()),
        E::Crypto(_) | E::Store(_) => {
          tracing::error!(error = %e, "request failed");
          (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
        }
      },
    };

    let mut res = (status, Json(json!({ "error": message }))).into_response();
    // Only bearer rejections challenge; share-password and login failures
    // are not answered with a different credential.
    if matches!(&self, ApiError::Core(E::Unauthorized(m)) if *m == INVALID_CREDENTIAL) {
      res.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Bearer realm=\"leaflet\""),
      );
    }
    res
  }
}
