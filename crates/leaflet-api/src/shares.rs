//! Handlers for the owner-facing `/share` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/share/create` | Publish or republish a document |
//! | `GET`    | `/share/list` | `?page=&size=`, newest first |
//! | `DELETE` | `/share/batch` | Body `{"shareIds":[..]}`; empty or absent deletes all |
//! | `DELETE` | `/share/{id}` | 404 if missing or not owned |

use std::collections::BTreeMap;

use axum::{
  Json,
  body::Bytes,
  extract::{Path, State},
};
use chrono::{DateTime, Utc};
use leaflet_core::{
  Error,
  share::{BatchDeleteOutcome, BlockReference, PublishRequest, Share},
  store::PublicationStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::Authenticated,
  base_url::BaseUrl,
  error::ApiError,
  extract::{JsonBody, QueryParams, lenient_u32},
};

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub doc_id:           String,
  pub doc_title:        String,
  pub content:          String,
  #[serde(default)]
  pub require_password: bool,
  #[serde(default)]
  pub password:         Option<String>,
  pub expire_days:      u32,
  #[serde(default)]
  pub is_public:        bool,
  #[serde(default)]
  pub references:       Vec<BlockReference>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedShare {
  pub share_id:         Uuid,
  pub share_url:        String,
  pub doc_id:           String,
  pub doc_title:        String,
  pub require_password: bool,
  pub expire_at:        DateTime<Utc>,
  pub is_public:        bool,
  pub created_at:       DateTime<Utc>,
  pub updated_at:       DateTime<Utc>,
  pub reused:           bool,
}

/// `POST /share/create`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  base: BaseUrl,
  JsonBody(body): JsonBody<CreateBody>,
) -> Result<Json<CreatedShare>, ApiError>
where
  S: PublicationStore + 'static,
{
  let request = PublishRequest {
    document_id:   body.doc_id,
    title:         body.doc_title,
    body:          body.content,
    want_password: body.require_password,
    password:      body.password,
    is_public:     body.is_public,
    expire_days:   body.expire_days,
    references:    body.references,
  };
  let published = state.shares.publish(principal.user_id, request).await?;
  let share = published.share;

  Ok(Json(CreatedShare {
    share_id:         share.share_id,
    share_url:        base.share_url(share.share_id),
    doc_id:           share.document_id,
    doc_title:        share.title,
    require_password: share.access.requires_password(),
    expire_at:        share.expires_at,
    is_public:        share.is_public,
    created_at:       share.created_at,
    updated_at:       share.updated_at,
    reused:           published.reused,
  }))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default, deserialize_with = "lenient_u32")]
  pub page: Option<u32>,
  #[serde(default, deserialize_with = "lenient_u32")]
  pub size: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareItem {
  pub id:               Uuid,
  pub doc_id:           String,
  pub doc_title:        String,
  pub require_password: bool,
  pub expire_at:        DateTime<Utc>,
  pub is_public:        bool,
  pub view_count:       u64,
  pub created_at:       DateTime<Utc>,
  pub share_url:        String,
}

impl ShareItem {
  fn new(share: Share, base: &BaseUrl) -> Self {
    Self {
      id:               share.share_id,
      share_url:        base.share_url(share.share_id),
      doc_id:           share.document_id,
      doc_title:        share.title,
      require_password: share.access.requires_password(),
      expire_at:        share.expires_at,
      is_public:        share.is_public,
      view_count:       share.view_count,
      created_at:       share.created_at,
    }
  }
}

#[derive(Debug, Serialize)]
pub struct ShareList {
  pub items: Vec<ShareItem>,
  pub page:  u32,
  pub size:  u32,
  pub total: u64,
}

/// `GET /share/list[?page=<n>&size=<n>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  base: BaseUrl,
  QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<ShareList>, ApiError>
where
  S: PublicationStore + 'static,
{
  let page = state
    .shares
    .list_owned(principal.user_id, params.page, params.size)
    .await?;

  Ok(Json(ShareList {
    items: page.items.into_iter().map(|s| ShareItem::new(s, &base)).collect(),
    page:  page.page,
    size:  page.page_size,
    total: page.total,
  }))
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /share/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: PublicationStore + 'static,
{
  let share_id = parse_share_id(&id)?;
  state.shares.delete(principal.user_id, share_id).await?;
  Ok(Json(serde_json::json!({ "deleted": share_id })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchBody {
  #[serde(default)]
  pub share_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchResult {
  #[serde(rename_all = "camelCase")]
  All { deleted_all_count: u64 },
  #[serde(rename_all = "camelCase")]
  Partial {
    deleted:   Vec<String>,
    not_found: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    failed:    BTreeMap<String, String>,
  },
}

impl From<BatchDeleteOutcome> for BatchResult {
  fn from(outcome: BatchDeleteOutcome) -> Self {
    match outcome {
      BatchDeleteOutcome::All { deleted } => Self::All { deleted_all_count: deleted },
      BatchDeleteOutcome::Partial { deleted, not_found, failed } => Self::Partial {
        deleted,
        not_found,
        failed: failed.into_iter().collect(),
      },
    }
  }
}

/// `DELETE /share/batch`. An absent body means "delete everything".
pub async fn batch_delete<S>(
  State(state): State<AppState<S>>,
  Authenticated(principal): Authenticated,
  body: Bytes,
) -> Result<Json<BatchResult>, ApiError>
where
  S: PublicationStore + 'static,
{
  let body: BatchBody = if body.iter().all(u8::is_ascii_whitespace) {
    BatchBody::default()
  } else {
    serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
  };

  let outcome = state
    .shares
    .batch_delete(principal.user_id, body.share_ids)
    .await?;
  Ok(Json(outcome.into()))
}

/// Share ids that do not parse cannot exist.
pub(crate) fn parse_share_id(raw: &str) -> Result<Uuid, ApiError> {
  Uuid::parse_str(raw.trim()).map_err(|_| ApiError::Core(Error::NotFound("share")))
}
