//! Handlers for `/token` endpoints: API credential management.
//!
//! The plaintext secret only ever appears in the `create` and `refresh`
//! responses.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use leaflet_core::{Error, account::ApiToken, store::PublicationStore};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::Authenticated, error::ApiError, extract::JsonBody};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenItem {
  pub id:           Uuid,
  pub label:        String,
  pub revoked:      bool,
  pub last_used_at: Option<DateTime<Utc>>,
  pub created_at:   DateTime<Utc>,
}

impl From<ApiToken> for TokenItem {
  fn from(token: ApiToken) -> Self {
    Self {
      id:           token.token_id,
      label:        token.label,
      revoked:      token.revoked,
      last_used_at: token.last_used_at,
      created_at:   token.created_at,
    }
  }
}

/// `GET /token/list`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Vec<TokenItem>>, ApiError>
where
  S: PublicationStore + 'static,
{
  let tokens = state.credentials.list(principal.user_id).await?;
  Ok(Json(tokens.into_iter().map(TokenItem::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  #[serde(alias = "name")]
  pub label: String,
}

/// `POST /token/create`. Body: `{"label":"laptop"}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PublicationStore + 'static,
{
  let issued = state.credentials.issue(principal.user_id, &body.label).await?;
  Ok((StatusCode::CREATED, Json(issued)))
}

/// `POST /token/refresh/{id}`
pub async fn refresh<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PublicationStore + 'static,
{
  let token_id = parse_token_id(&id)?;
  let issued = state.credentials.refresh(principal.user_id, token_id).await?;
  Ok(Json(issued))
}

/// `POST /token/revoke/{id}`
pub async fn revoke<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PublicationStore + 'static,
{
  let token_id = parse_token_id(&id)?;
  state.credentials.revoke(principal.user_id, token_id).await?;
  Ok(Json(serde_json::json!({ "revoked": token_id })))
}

fn parse_token_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Core(Error::NotFound("token")))
}
