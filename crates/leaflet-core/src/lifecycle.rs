//! The share lifecycle: publish (create or reuse), view, list and delete.
//!
//! Publishing a document that already has an active share updates that
//! share in place, so its id and every link handed out for it stay valid.
//! Each supplied block reference gets the same create-or-reuse treatment as
//! a child share that mirrors the parent's access policy and expiry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  clock::Clock,
  crypto,
  error::PASSWORD_REJECTED,
  references,
  share::{
    Access, BatchDeleteOutcome, BlockReference, Page, PublishRequest, Published, Share,
    SharedView,
  },
  store::PublicationStore,
};

pub const MIN_PASSWORD_CHARS: usize = 4;
pub const MIN_EXPIRE_DAYS: u32 = 1;
pub const MAX_EXPIRE_DAYS: u32 = 365;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// The fields written on every create or republish.
struct Draft {
  title:           String,
  body:            String,
  references:      Vec<BlockReference>,
  parent_share_id: Option<Uuid>,
  access:          Access,
  is_public:       bool,
  expires_at:      DateTime<Utc>,
}

/// Share operations over an injected store and clock.
pub struct Shares<S> {
  store: Arc<S>,
  clock: Arc<dyn Clock>,
}

impl<S> Clone for Shares<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), clock: Arc::clone(&self.clock) }
  }
}

impl<S: PublicationStore> Shares<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self { Self { store, clock } }

  // ── Publish ───────────────────────────────────────────────────────────

  /// Create or republish the share for `(owner_id, request.document_id)`.
  ///
  /// Child-share propagation is best-effort: a failing reference is logged
  /// and skipped, never failing the parent.
  pub async fn publish(&self, owner_id: Uuid, request: PublishRequest) -> Result<Published> {
    validate(&request)?;

    let now = self.clock.now();
    let existing = self.active_share(owner_id, &request.document_id, now).await?;
    let access = resolve_access(
      request.want_password,
      request.password.as_deref(),
      existing.as_ref(),
    )?;

    let draft = Draft {
      title: request.title,
      body: request.body,
      references: request.references,
      parent_share_id: None,
      access,
      is_public: request.is_public,
      expires_at: now + Duration::days(i64::from(request.expire_days)),
    };
    let published = self.save(owner_id, request.document_id, existing, draft, now).await?;

    tracing::info!(
      share_id = %published.share.share_id,
      reused = published.reused,
      references = published.share.references.len(),
      "published share",
    );

    for reference in &published.share.references {
      if let Err(e) = self.propagate(&published.share, reference, now).await {
        tracing::warn!(
          parent = %published.share.share_id,
          block_id = %reference.block_id,
          error = %e,
          "failed to publish child share",
        );
      }
    }

    Ok(published)
  }

  /// Apply create-or-reuse to the child share of one referenced block.
  async fn propagate(
    &self,
    parent: &Share,
    reference: &BlockReference,
    now: DateTime<Utc>,
  ) -> Result<()> {
    let block_id = reference.block_id.trim();
    if block_id.is_empty() || block_id == parent.document_id {
      tracing::warn!(
        parent = %parent.share_id,
        %block_id,
        "skipping self-referential or blank block reference",
      );
      return Ok(());
    }

    let existing = self.active_share(parent.owner_id, block_id, now).await?;
    let draft = Draft {
      title:           references::derive_title(reference),
      body:            reference.content.clone(),
      references:      Vec::new(),
      parent_share_id: Some(parent.share_id),
      access:          parent.access.clone(),
      is_public:       parent.is_public,
      expires_at:      parent.expires_at,
    };
    self.save(parent.owner_id, block_id.to_owned(), existing, draft, now).await?;
    Ok(())
  }

  /// The newest share for the pair, unless it has already expired.
  async fn active_share(
    &self,
    owner_id: Uuid,
    document_id: &str,
    now: DateTime<Utc>,
  ) -> Result<Option<Share>> {
    let latest = self
      .store
      .latest_share_for_document(owner_id, document_id)
      .await
      .map_err(Error::store)?;
    Ok(latest.filter(|s| !s.is_expired(now)))
  }

  async fn save(
    &self,
    owner_id: Uuid,
    document_id: String,
    existing: Option<Share>,
    draft: Draft,
    now: DateTime<Utc>,
  ) -> Result<Published> {
    let reused = existing.is_some();
    let mut share = existing.unwrap_or_else(|| Share {
      share_id: Uuid::new_v4(),
      owner_id,
      document_id,
      title: String::new(),
      body: String::new(),
      references: Vec::new(),
      parent_share_id: None,
      access: Access::Open,
      is_public: false,
      view_count: 0,
      expires_at: now,
      created_at: now,
      updated_at: now,
    });

    share.title = draft.title;
    share.body = draft.body;
    share.references = draft.references;
    share.access = draft.access;
    share.is_public = draft.is_public;
    share.expires_at = draft.expires_at;
    share.updated_at = now;
    if draft.parent_share_id.is_some() {
      share.parent_share_id = draft.parent_share_id;
    }

    self.store.upsert_share(share.clone()).await.map_err(Error::store)?;
    Ok(Published { share, reused })
  }

  // ── View ──────────────────────────────────────────────────────────────

  /// Gate and render a share. Expiry is checked before the password, so an
  /// expired share is reported as such whatever password is supplied.
  pub async fn view(
    &self,
    share_id: Uuid,
    password: Option<&str>,
    base_url: &str,
  ) -> Result<SharedView> {
    let share = self
      .store
      .get_share(share_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound("share"))?;

    let now = self.clock.now();
    if share.is_expired(now) {
      return Err(Error::Expired);
    }

    if let Access::Password(hash) = &share.access {
      let supplied = password.map(str::trim).filter(|p| !p.is_empty());
      match supplied {
        Some(p) if crypto::verify_password(p, hash) => {}
        _ => return Err(Error::Unauthorized(PASSWORD_REJECTED)),
      }
    }

    if let Err(e) = self.store.increment_view_count(share.share_id).await {
      tracing::warn!(share_id = %share.share_id, error = %e, "failed to bump view count");
    }

    let links = references::resolve_links(
      self.store.as_ref(),
      share.owner_id,
      &share.body,
      &share.references,
      now,
    )
    .await;
    let body = references::rewrite(&share.body, &share.references, &links, base_url);

    Ok(SharedView {
      share_id: share.share_id,
      title: share.title,
      body,
      password_required: share.access.requires_password(),
      expires_at: share.expires_at,
      view_count: share.view_count + 1,
      created_at: share.created_at,
    })
  }

  // ── List ──────────────────────────────────────────────────────────────

  /// One page of the owner's shares, newest first. `page` is 1-based;
  /// missing or zero values fall back to defaults and the size is capped.
  pub async fn list_owned(
    &self,
    owner_id: Uuid,
    page: Option<u32>,
    page_size: Option<u32>,
  ) -> Result<Page<Share>> {
    let page = page.filter(|p| *p > 0).unwrap_or(1);
    let page_size = page_size
      .filter(|s| *s > 0)
      .unwrap_or(DEFAULT_PAGE_SIZE)
      .min(MAX_PAGE_SIZE);
    let offset = u64::from(page - 1) * u64::from(page_size);

    let total = self.store.count_shares(owner_id).await.map_err(Error::store)?;
    let items = self
      .store
      .list_shares(owner_id, page_size, offset)
      .await
      .map_err(Error::store)?;

    Ok(Page { items, page, page_size, total })
  }

  // ── Delete ────────────────────────────────────────────────────────────

  /// Soft-delete a share the caller owns. Missing and foreign ids are both
  /// reported as not found.
  pub async fn delete(&self, owner_id: Uuid, share_id: Uuid) -> Result<()> {
    let deleted = self
      .store
      .soft_delete_share(owner_id, share_id, self.clock.now())
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::NotFound("share"));
    }
    Ok(())
  }

  /// Delete several shares, or all of them when `share_ids` is empty.
  /// Per-id failures are collected, not propagated.
  pub async fn batch_delete(
    &self,
    owner_id: Uuid,
    share_ids: Vec<String>,
  ) -> Result<BatchDeleteOutcome> {
    let now = self.clock.now();

    if share_ids.is_empty() {
      let deleted = self
        .store
        .soft_delete_shares_by_owner(owner_id, now)
        .await
        .map_err(Error::store)?;
      tracing::info!(%owner_id, deleted, "deleted all shares");
      return Ok(BatchDeleteOutcome::All { deleted });
    }

    let mut deleted = Vec::new();
    let mut not_found = Vec::new();
    let mut failed = Vec::new();

    for raw in share_ids {
      let id = raw.trim();
      if id.is_empty() {
        continue;
      }
      let Ok(share_id) = Uuid::parse_str(id) else {
        not_found.push(id.to_owned());
        continue;
      };
      match self.store.soft_delete_share(owner_id, share_id, now).await {
        Ok(true) => deleted.push(id.to_owned()),
        Ok(false) => not_found.push(id.to_owned()),
        Err(e) => failed.push((id.to_owned(), e.to_string())),
      }
    }

    Ok(BatchDeleteOutcome::Partial { deleted, not_found, failed })
  }
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn validate(request: &PublishRequest) -> Result<()> {
  if request.document_id.trim().is_empty() {
    return Err(Error::validation("document id is required"));
  }
  if request.title.trim().is_empty() {
    return Err(Error::validation("title is required"));
  }
  if request.body.is_empty() {
    return Err(Error::validation("content is required"));
  }
  if !(MIN_EXPIRE_DAYS..=MAX_EXPIRE_DAYS).contains(&request.expire_days) {
    return Err(Error::validation(format!(
      "expire days must be between {MIN_EXPIRE_DAYS} and {MAX_EXPIRE_DAYS}"
    )));
  }
  Ok(())
}

/// Decide the access policy for a publish.
///
/// Turning protection off always clears the hash. Turning it on needs a new
/// password unless the share being reused already has one.
fn resolve_access(
  want_password: bool,
  password: Option<&str>,
  existing: Option<&Share>,
) -> Result<Access> {
  if !want_password {
    return Ok(Access::Open);
  }

  match password.map(str::trim).filter(|p| !p.is_empty()) {
    Some(p) if p.chars().count() < MIN_PASSWORD_CHARS => Err(Error::validation(format!(
      "password must be at least {MIN_PASSWORD_CHARS} characters"
    ))),
    Some(p) => Ok(Access::Password(crypto::hash_password(p)?)),
    None => existing
      .and_then(|s| s.access.password_hash())
      .map(|hash| Access::Password(hash.to_owned()))
      .ok_or_else(|| Error::validation("password required for new share")),
  }
}
