//! [`SqliteStore`], the SQLite implementation of [`PublicationStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use leaflet_core::{
  account::{ApiToken, User},
  share::Share,
  store::PublicationStore,
};

use crate::{
  Result,
  encode::{
    RawApiToken, RawShare, RawUser, SHARE_COLUMNS, TOKEN_COLUMNS, USER_COLUMNS,
    encode_access, encode_dt, encode_references, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Leaflet store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_user_where(&self, column: &'static str, value: String) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![value], RawUser::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  /// Run an UPDATE/DELETE-style statement and report the affected row count.
  async fn execute(&self, sql: &'static str, params: Vec<String>) -> Result<usize> {
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params_from_iter(params))?))
      .await?;
    Ok(changed)
  }
}

// ─── PublicationStore impl ───────────────────────────────────────────────────

impl PublicationStore for SqliteStore {
  type Error = crate::Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn insert_user(&self, user: User) -> Result<()> {
    let id_str      = encode_uuid(user.user_id);
    let created_str = encode_dt(user.created_at);
    let updated_str = encode_dt(user.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (
             user_id, username, email, password_hash, is_active, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            user.username,
            user.email,
            user.password_hash,
            user.is_active,
            created_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    self.find_user_where("user_id", encode_uuid(user_id)).await
  }

  async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
    self.find_user_where("username", username.to_owned()).await
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    self.find_user_where("email", email.to_owned()).await
  }

  async fn set_user_active(&self, user_id: Uuid, active: bool, at: DateTime<Utc>) -> Result<bool> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(at);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET is_active = ?1, updated_at = ?2 WHERE user_id = ?3",
          rusqlite::params![active, at_str, id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn count_users(&self) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
      .await?;
    Ok(count.max(0) as u64)
  }

  // ── API tokens ────────────────────────────────────────────────────────────

  async fn insert_api_token(&self, token: ApiToken) -> Result<()> {
    let id_str        = encode_uuid(token.token_id);
    let owner_str     = encode_uuid(token.owner_id);
    let last_used_str = token.last_used_at.map(encode_dt);
    let created_str   = encode_dt(token.created_at);
    let updated_str   = encode_dt(token.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO api_tokens (
             token_id, owner_id, label, digest, revoked, last_used_at, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            id_str,
            owner_str,
            token.label,
            token.digest,
            token.revoked,
            last_used_str,
            created_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_api_tokens(&self, owner_id: Uuid) -> Result<Vec<ApiToken>> {
    let owner_str = encode_uuid(owner_id);
    let sql = format!(
      "SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE owner_id = ?1
       ORDER BY created_at DESC, rowid DESC"
    );
    let raws: Vec<RawApiToken> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str], RawApiToken::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawApiToken::into_token).collect()
  }

  async fn find_api_token_by_digest(&self, digest: &str) -> Result<Option<ApiToken>> {
    let digest = digest.to_owned();
    let sql = format!("SELECT {TOKEN_COLUMNS} FROM api_tokens WHERE digest = ?1 AND revoked = 0");
    let raw: Option<RawApiToken> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![digest], RawApiToken::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawApiToken::into_token).transpose()
  }

  async fn get_live_api_token(&self, owner_id: Uuid, token_id: Uuid) -> Result<Option<ApiToken>> {
    let owner_str = encode_uuid(owner_id);
    let id_str = encode_uuid(token_id);
    let sql = format!(
      "SELECT {TOKEN_COLUMNS} FROM api_tokens
       WHERE token_id = ?1 AND owner_id = ?2 AND revoked = 0"
    );
    let raw: Option<RawApiToken> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str, owner_str], RawApiToken::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawApiToken::into_token).transpose()
  }

  async fn replace_api_token_digest(
    &self,
    token_id: Uuid,
    digest: String,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let changed = self
      .execute(
        "UPDATE api_tokens SET digest = ?1, updated_at = ?2
         WHERE token_id = ?3 AND revoked = 0",
        vec![digest, encode_dt(at), encode_uuid(token_id)],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn revoke_api_token(&self, owner_id: Uuid, token_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let changed = self
      .execute(
        "UPDATE api_tokens SET revoked = 1, updated_at = ?1
         WHERE token_id = ?2 AND owner_id = ?3 AND revoked = 0",
        vec![encode_dt(at), encode_uuid(token_id), encode_uuid(owner_id)],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn touch_api_token(&self, token_id: Uuid, at: DateTime<Utc>) -> Result<()> {
    self
      .execute(
        "UPDATE api_tokens SET last_used_at = ?1 WHERE token_id = ?2",
        vec![encode_dt(at), encode_uuid(token_id)],
      )
      .await?;
    Ok(())
  }

  // ── Shares ────────────────────────────────────────────────────────────────

  async fn get_share(&self, share_id: Uuid) -> Result<Option<Share>> {
    let id_str = encode_uuid(share_id);
    let sql = format!("SELECT {SHARE_COLUMNS} FROM shares WHERE share_id = ?1 AND deleted_at IS NULL");
    let raw: Option<RawShare> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawShare::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawShare::into_share).transpose()
  }

  async fn latest_share_for_document(
    &self,
    owner_id: Uuid,
    document_id: &str,
  ) -> Result<Option<Share>> {
    let owner_str = encode_uuid(owner_id);
    let document_id = document_id.to_owned();
    let sql = format!(
      "SELECT {SHARE_COLUMNS} FROM shares
       WHERE owner_id = ?1 AND document_id = ?2 AND deleted_at IS NULL
       ORDER BY created_at DESC, rowid DESC
       LIMIT 1"
    );
    let raw: Option<RawShare> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![owner_str, document_id], RawShare::from_row)
            .optional()?,
        )
      })
      .await?;
    raw.map(RawShare::into_share).transpose()
  }

  async fn upsert_share(&self, share: Share) -> Result<()> {
    let id_str         = encode_uuid(share.share_id);
    let owner_str      = encode_uuid(share.owner_id);
    let refs_json      = encode_references(&share.references)?;
    let parent_str     = share.parent_share_id.map(encode_uuid);
    let (gated, hash)  = encode_access(&share.access);
    let view_count     = i64::try_from(share.view_count).unwrap_or(i64::MAX);
    let expires_str    = encode_dt(share.expires_at);
    let created_str    = encode_dt(share.created_at);
    let updated_str    = encode_dt(share.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO shares (
             share_id, owner_id, document_id, title, body, references_json,
             parent_share_id, require_password, password_hash, is_public,
             view_count, expires_at, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
           ON CONFLICT(share_id) DO UPDATE SET
             title            = excluded.title,
             body             = excluded.body,
             references_json  = excluded.references_json,
             parent_share_id  = excluded.parent_share_id,
             require_password = excluded.require_password,
             password_hash    = excluded.password_hash,
             is_public        = excluded.is_public,
             expires_at       = excluded.expires_at,
             updated_at       = excluded.updated_at",
          rusqlite::params![
            id_str,
            owner_str,
            share.document_id,
            share.title,
            share.body,
            refs_json,
            parent_str,
            gated,
            hash,
            share.is_public,
            view_count,
            expires_str,
            created_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_shares(&self, owner_id: Uuid, limit: u32, offset: u64) -> Result<Vec<Share>> {
    let owner_str = encode_uuid(owner_id);
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let sql = format!(
      "SELECT {SHARE_COLUMNS} FROM shares
       WHERE owner_id = ?1 AND deleted_at IS NULL
       ORDER BY created_at DESC, rowid DESC
       LIMIT ?2 OFFSET ?3"
    );
    let raws: Vec<RawShare> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str, limit, offset], RawShare::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawShare::into_share).collect()
  }

  async fn count_shares(&self, owner_id: Uuid) -> Result<u64> {
    let owner_str = encode_uuid(owner_id);
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM shares WHERE owner_id = ?1 AND deleted_at IS NULL",
          rusqlite::params![owner_str],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count.max(0) as u64)
  }

  async fn increment_view_count(&self, share_id: Uuid) -> Result<()> {
    self
      .execute(
        "UPDATE shares SET view_count = view_count + 1
         WHERE share_id = ?1 AND deleted_at IS NULL",
        vec![encode_uuid(share_id)],
      )
      .await?;
    Ok(())
  }

  async fn soft_delete_share(&self, owner_id: Uuid, share_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let changed = self
      .execute(
        "UPDATE shares SET deleted_at = ?1
         WHERE share_id = ?2 AND owner_id = ?3 AND deleted_at IS NULL",
        vec![encode_dt(at), encode_uuid(share_id), encode_uuid(owner_id)],
      )
      .await?;
    Ok(changed > 0)
  }

  async fn soft_delete_shares_by_owner(&self, owner_id: Uuid, at: DateTime<Utc>) -> Result<u64> {
    let changed = self
      .execute(
        "UPDATE shares SET deleted_at = ?1 WHERE owner_id = ?2 AND deleted_at IS NULL",
        vec![encode_dt(at), encode_uuid(owner_id)],
      )
      .await?;
    tracing::debug!(%owner_id, changed, "soft-deleted all shares");
    Ok(changed as u64)
  }
}
