//! The `PublicationStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `leaflet-store-sqlite`).
//! The services in this crate and the HTTP layer depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  account::{ApiToken, User},
  share::Share,
};

/// Abstraction over a Leaflet storage backend.
///
/// Deleted shares are soft-deleted: every read below ignores them. Expiry is
/// *not* filtered by the store; callers compare against their own clock.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PublicationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new user. Fails if the username or email is taken.
  fn insert_user(
    &self,
    user: User,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Returns `false` if no such user exists.
  fn set_user_active(
    &self,
    user_id: Uuid,
    active: bool,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn count_users(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── API tokens ────────────────────────────────────────────────────────

  fn insert_api_token(
    &self,
    token: ApiToken,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// All tokens of `owner_id`, revoked ones included, newest first.
  fn list_api_tokens(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ApiToken>, Self::Error>> + Send + '_;

  /// Look up a non-revoked token by the digest of its secret.
  fn find_api_token_by_digest<'a>(
    &'a self,
    digest: &'a str,
  ) -> impl Future<Output = Result<Option<ApiToken>, Self::Error>> + Send + 'a;

  /// A non-revoked token belonging to `owner_id`.
  fn get_live_api_token(
    &self,
    owner_id: Uuid,
    token_id: Uuid,
  ) -> impl Future<Output = Result<Option<ApiToken>, Self::Error>> + Send + '_;

  /// Swap the stored digest (secret rotation). Returns `false` if the token
  /// is missing or revoked.
  fn replace_api_token_digest(
    &self,
    token_id: Uuid,
    digest: String,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Returns `false` if the token is missing, not owned, or already revoked.
  fn revoke_api_token(
    &self,
    owner_id: Uuid,
    token_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Best-effort last-used stamp.
  fn touch_api_token(
    &self,
    token_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Shares ────────────────────────────────────────────────────────────

  fn get_share(
    &self,
    share_id: Uuid,
  ) -> impl Future<Output = Result<Option<Share>, Self::Error>> + Send + '_;

  /// The most recently created share for `(owner_id, document_id)`,
  /// regardless of expiry.
  fn latest_share_for_document<'a>(
    &'a self,
    owner_id: Uuid,
    document_id: &'a str,
  ) -> impl Future<Output = Result<Option<Share>, Self::Error>> + Send + 'a;

  /// Insert or overwrite the row keyed by `share.share_id`. An overwrite
  /// keeps the stored `created_at` and `view_count`.
  fn upsert_share(
    &self,
    share: Share,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Shares of `owner_id`, newest first.
  fn list_shares(
    &self,
    owner_id: Uuid,
    limit: u32,
    offset: u64,
  ) -> impl Future<Output = Result<Vec<Share>, Self::Error>> + Send + '_;

  fn count_shares(
    &self,
    owner_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Add one to the view counter. Lost updates under contention are
  /// acceptable.
  fn increment_view_count(
    &self,
    share_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the share is missing, not owned, or already deleted.
  fn soft_delete_share(
    &self,
    owner_id: Uuid,
    share_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Soft-delete every live share of `owner_id`; returns how many.
  fn soft_delete_shares_by_owner(
    &self,
    owner_id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}
