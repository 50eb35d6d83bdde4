//! Liveness endpoints.

use axum::{Json, extract::State};
use chrono::Utc;
use leaflet_core::{account::CredentialKind, store::PublicationStore};
use serde_json::{Value, json};

use crate::{AppState, auth::Authenticated, error::ApiError};

/// `GET /health`. Touches the store so a broken database shows up here.
pub async fn public<S>(State(state): State<AppState<S>>) -> Result<Json<Value>, ApiError>
where
  S: PublicationStore + 'static,
{
  let users = state.accounts.count_users().await?;
  Ok(Json(json!({
    "status":    "ok",
    "timestamp": Utc::now().timestamp(),
    "users":     users,
    "version":   env!("CARGO_PKG_VERSION"),
  })))
}

/// `GET /auth/health`
pub async fn authenticated<S>(
  Authenticated(principal): Authenticated,
  State(_state): State<AppState<S>>,
) -> Json<Value>
where
  S: PublicationStore + 'static,
{
  let via = match principal.kind {
    CredentialKind::Session => json!({ "kind": "session" }),
    CredentialKind::ApiToken { token_id, label } => {
      json!({ "kind": "apiToken", "tokenId": token_id, "label": label })
    }
  };
  Json(json!({
    "status": "ok",
    "userId": principal.user_id,
    "credential": via,
  }))
}
