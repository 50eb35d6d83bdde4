//! In-memory [`PublicationStore`] for unit tests, with failure injection.

use std::{
  collections::HashSet,
  sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  account::{ApiToken, User},
  share::Share,
  store::PublicationStore,
};

#[derive(Debug, thiserror::Error)]
#[error("injected failure: {0}")]
pub struct Injected(pub String);

#[derive(Default)]
struct Inner {
  users:  Vec<User>,
  tokens: Vec<ApiToken>,
  /// `(share, deleted)`, in insertion order.
  shares: Vec<(Share, bool)>,
  /// Upserts for these document ids fail.
  failing_documents: HashSet<String>,
  /// Soft deletes for these share ids fail.
  failing_deletes: HashSet<Uuid>,
  fail_view_count: bool,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn fail_upserts_for(&self, document_id: &str) {
    self.lock().failing_documents.insert(document_id.to_owned());
  }

  pub fn fail_deletes_for(&self, share_id: Uuid) {
    self.lock().failing_deletes.insert(share_id);
  }

  pub fn fail_view_count(&self) { self.lock().fail_view_count = true; }

  /// Every stored share, deleted ones included.
  pub fn all_shares(&self) -> Vec<Share> {
    self.lock().shares.iter().map(|(s, _)| s.clone()).collect()
  }

  pub fn token(&self, token_id: Uuid) -> Option<ApiToken> {
    self.lock().tokens.iter().find(|t| t.token_id == token_id).cloned()
  }
}

impl PublicationStore for MemoryStore {
  type Error = Injected;

  async fn insert_user(&self, user: User) -> Result<(), Injected> {
    let mut inner = self.lock();
    if inner
      .users
      .iter()
      .any(|u| u.username == user.username || u.email == user.email)
    {
      return Err(Injected("duplicate user".into()));
    }
    inner.users.push(user);
    Ok(())
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>, Injected> {
    Ok(self.lock().users.iter().find(|u| u.user_id == user_id).cloned())
  }

  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Injected> {
    Ok(self.lock().users.iter().find(|u| u.username == username).cloned())
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Injected> {
    Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
  }

  async fn set_user_active(
    &self,
    user_id: Uuid,
    active: bool,
    at: DateTime<Utc>,
  ) -> Result<bool, Injected> {
    let mut inner = self.lock();
    let Some(user) = inner.users.iter_mut().find(|u| u.user_id == user_id) else {
      return Ok(false);
    };
    user.is_active = active;
    user.updated_at = at;
    Ok(true)
  }

  async fn count_users(&self) -> Result<u64, Injected> { Ok(self.lock().users.len() as u64) }

  async fn insert_api_token(&self, token: ApiToken) -> Result<(), Injected> {
    self.lock().tokens.push(token);
    Ok(())
  }

  async fn list_api_tokens(&self, owner_id: Uuid) -> Result<Vec<ApiToken>, Injected> {
    let mut tokens: Vec<ApiToken> = self
      .lock()
      .tokens
      .iter()
      .filter(|t| t.owner_id == owner_id)
      .cloned()
      .collect();
    tokens.reverse();
    Ok(tokens)
  }

  async fn find_api_token_by_digest(&self, digest: &str) -> Result<Option<ApiToken>, Injected> {
    Ok(
      self
        .lock()
        .tokens
        .iter()
        .find(|t| t.digest == digest && !t.revoked)
        .cloned(),
    )
  }

  async fn get_live_api_token(
    &self,
    owner_id: Uuid,
    token_id: Uuid,
  ) -> Result<Option<ApiToken>, Injected> {
    Ok(
      self
        .lock()
        .tokens
        .iter()
        .find(|t| t.token_id == token_id && t.owner_id == owner_id && !t.revoked)
        .cloned(),
    )
  }

  async fn replace_api_token_digest(
    &self,
    token_id: Uuid,
    digest: String,
    at: DateTime<Utc>,
  ) -> Result<bool, Injected> {
    let mut inner = self.lock();
    let Some(token) = inner
      .tokens
      .iter_mut()
      .find(|t| t.token_id == token_id && !t.revoked)
    else {
      return Ok(false);
    };
    token.digest = digest;
    token.updated_at = at;
    Ok(true)
  }

  async fn revoke_api_token(
    &self,
    owner_id: Uuid,
    token_id: Uuid,
    at: DateTime<Utc>,
  ) -> Result<bool, Injected> {
    let mut inner = self.lock();
    let Some(token) = inner
      .tokens
      .iter_mut()
      .find(|t| t.token_id == token_id && t.owner_id == owner_id && !t.revoked)
    else {
      return Ok(false);
    };
    token.revoked = true;
    token.updated_at = at;
    Ok(true)
  }

  async fn touch_api_token(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<(), Injected> {
    if let Some(token) = self.lock().tokens.iter_mut().find(|t| t.token_id == token_id) {
      token.last_used_at = Some(at);
    }
    Ok(())
  }

  async fn get_share(&self, share_id: Uuid) -> Result<Option<Share>, Injected> {
    Ok(
      self
        .lock()
        .shares
        .iter()
        .find(|(s, deleted)| s.share_id == share_id && !deleted)
        .map(|(s, _)| s.clone()),
    )
  }

  async fn latest_share_for_document(
    &self,
    owner_id: Uuid,
    document_id: &str,
  ) -> Result<Option<Share>, Injected> {
    Ok(
      self
        .lock()
        .shares
        .iter()
        .filter(|(s, deleted)| !deleted && s.owner_id == owner_id && s.document_id == document_id)
        .map(|(s, _)| s)
        .max_by_key(|s| s.created_at)
        .cloned(),
    )
  }

  async fn upsert_share(&self, share: Share) -> Result<(), Injected> {
    let mut inner = self.lock();
    if inner.failing_documents.contains(&share.document_id) {
      return Err(Injected(format!("upsert {}", share.document_id)));
    }
    match inner.shares.iter_mut().find(|(s, _)| s.share_id == share.share_id) {
      Some((existing, _)) => {
        let view_count = existing.view_count;
        *existing = Share { view_count, ..share };
      }
      None => inner.shares.push((share, false)),
    }
    Ok(())
  }

  async fn list_shares(
    &self,
    owner_id: Uuid,
    limit: u32,
    offset: u64,
  ) -> Result<Vec<Share>, Injected> {
    let mut shares: Vec<Share> = self
      .lock()
      .shares
      .iter()
      .filter(|(s, deleted)| !deleted && s.owner_id == owner_id)
      .map(|(s, _)| s.clone())
      .collect();
    shares.reverse();
    shares.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(
      shares
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .collect(),
    )
  }

  async fn count_shares(&self, owner_id: Uuid) -> Result<u64, Injected> {
    Ok(
      self
        .lock()
        .shares
        .iter()
        .filter(|(s, deleted)| !deleted && s.owner_id == owner_id)
        .count() as u64,
    )
  }

  async fn increment_view_count(&self, share_id: Uuid) -> Result<(), Injected> {
    let mut inner = self.lock();
    if inner.fail_view_count {
      return Err(Injected("view count".into()));
    }
    if let Some((share, _)) = inner.shares.iter_mut().find(|(s, _)| s.share_id == share_id) {
      share.view_count += 1;
    }
    Ok(())
  }

  async fn soft_delete_share(
    &self,
    owner_id: Uuid,
    share_id: Uuid,
    _at: DateTime<Utc>,
  ) -> Result<bool, Injected> {
    let mut inner = self.lock();
    if inner.failing_deletes.contains(&share_id) {
      return Err(Injected(format!("delete {share_id}")));
    }
    match inner
      .shares
      .iter_mut()
      .find(|(s, deleted)| !deleted && s.share_id == share_id && s.owner_id == owner_id)
    {
      Some((_, deleted)) => {
        *deleted = true;
        Ok(true)
      }
      None => Ok(false),
    }
  }

  async fn soft_delete_shares_by_owner(
    &self,
    owner_id: Uuid,
    _at: DateTime<Utc>,
  ) -> Result<u64, Injected> {
    let mut count = 0;
    for (share, deleted) in self.lock().shares.iter_mut() {
      if !*deleted && share.owner_id == owner_id {
        *deleted = true;
        count += 1;
      }
    }
    Ok(count)
  }
}
