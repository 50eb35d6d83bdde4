//! `GET /s/{id}`: the public, anonymous view of a share.

use axum::{
  Json,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use leaflet_core::store::PublicationStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  base_url::BaseUrl,
  error::ApiError,
  extract::QueryParams,
  shares::parse_share_id,
};

#[derive(Debug, Deserialize)]
pub struct ViewParams {
  pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedShare {
  pub id:               Uuid,
  pub doc_title:        String,
  pub content:          String,
  pub require_password: bool,
  pub expire_at:        DateTime<Utc>,
  pub view_count:       u64,
  pub created_at:       DateTime<Utc>,
}

/// `GET /s/{id}[?password=<password>]`
///
/// 404 unknown, 410 expired, 401 wrong or missing password.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<String>,
  QueryParams(params): QueryParams<ViewParams>,
  base: BaseUrl,
) -> Result<Json<ViewedShare>, ApiError>
where
  S: PublicationStore + 'static,
{
  let share_id = parse_share_id(&id)?;
  let view = state
    .shares
    .view(share_id, params.password.as_deref(), &base.0)
    .await?;

  Ok(Json(ViewedShare {
    id:               view.share_id,
    doc_title:        view.title,
    content:          view.body,
    require_password: view.password_required,
    expire_at:        view.expires_at,
    view_count:       view.view_count,
    created_at:       view.created_at,
  }))
}
