//! Handlers for registration, login and the caller's profile.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use leaflet_core::{
  accounts::{LoginOutcome, Profile},
  store::PublicationStore,
};
use serde::Deserialize;

use crate::{AppState, auth::Authenticated, error::ApiError, extract::JsonBody};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub username: String,
  pub email:    String,
  pub password: String,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PublicationStore + 'static,
{
  let user = state
    .accounts
    .register(&body.username, &body.email, &body.password)
    .await?;
  Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub username: String,
  pub password: String,
}

/// `POST /auth/login`
pub async fn login<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<Json<LoginOutcome>, ApiError>
where
  S: PublicationStore + 'static,
{
  Ok(Json(state.accounts.login(&body.username, &body.password).await?))
}

/// `GET /user/me`
pub async fn me<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
) -> Result<Json<Profile>, ApiError>
where
  S: PublicationStore + 'static,
{
  Ok(Json(state.accounts.me(principal.user_id).await?))
}
