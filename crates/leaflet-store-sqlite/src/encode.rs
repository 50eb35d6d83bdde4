//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are fixed-width RFC 3339 strings (microsecond precision, `Z`
//! suffix) so lexical order equals chronological order. Block references are
//! stored as a JSON array. UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use leaflet_core::{
  account::{ApiToken, User},
  share::{Access, BlockReference, Share},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Access ───────────────────────────────────────────────────────────────────

/// Split into the `(require_password, password_hash)` column pair.
pub fn encode_access(access: &Access) -> (bool, Option<String>) {
  match access {
    Access::Open => (false, None),
    Access::Password(hash) => (true, Some(hash.clone())),
  }
}

pub fn decode_access(require_password: bool, hash: Option<String>) -> Result<Access> {
  match (require_password, hash) {
    (false, _) => Ok(Access::Open),
    (true, Some(hash)) if !hash.is_empty() => Ok(Access::Password(hash)),
    (true, _) => Err(Error::Corrupt("password required but no hash stored".into())),
  }
}

// ─── References ───────────────────────────────────────────────────────────────

pub fn encode_references(refs: &[BlockReference]) -> Result<String> {
  Ok(serde_json::to_string(refs)?)
}

pub fn decode_references(s: &str) -> Result<Vec<BlockReference>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str =
  "user_id, username, email, password_hash, is_active, created_at, updated_at";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:       String,
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub is_active:     bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:       row.get(0)?,
      username:      row.get(1)?,
      email:         row.get(2)?,
      password_hash: row.get(3)?,
      is_active:     row.get(4)?,
      created_at:    row.get(5)?,
      updated_at:    row.get(6)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:       decode_uuid(&self.user_id)?,
      username:      self.username,
      email:         self.email,
      password_hash: self.password_hash,
      is_active:     self.is_active,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub const TOKEN_COLUMNS: &str =
  "token_id, owner_id, label, digest, revoked, last_used_at, created_at, updated_at";

/// Raw values read directly from an `api_tokens` row.
pub struct RawApiToken {
  pub token_id:     String,
  pub owner_id:     String,
  pub label:        String,
  pub digest:       String,
  pub revoked:      bool,
  pub last_used_at: Option<String>,
  pub created_at:   String,
  pub updated_at:   String,
}

impl RawApiToken {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      token_id:     row.get(0)?,
      owner_id:     row.get(1)?,
      label:        row.get(2)?,
      digest:       row.get(3)?,
      revoked:      row.get(4)?,
      last_used_at: row.get(5)?,
      created_at:   row.get(6)?,
      updated_at:   row.get(7)?,
    })
  }

  pub fn into_token(self) -> Result<ApiToken> {
    Ok(ApiToken {
      token_id:     decode_uuid(&self.token_id)?,
      owner_id:     decode_uuid(&self.owner_id)?,
      label:        self.label,
      digest:       self.digest,
      revoked:      self.revoked,
      last_used_at: self.last_used_at.as_deref().map(decode_dt).transpose()?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

pub const SHARE_COLUMNS: &str = "share_id, owner_id, document_id, title, body, references_json, \
                                 parent_share_id, require_password, password_hash, is_public, \
                                 view_count, expires_at, created_at, updated_at";

/// Raw values read directly from a `shares` row.
pub struct RawShare {
  pub share_id:         String,
  pub owner_id:         String,
  pub document_id:      String,
  pub title:            String,
  pub body:             String,
  pub references_json:  String,
  pub parent_share_id:  Option<String>,
  pub require_password: bool,
  pub password_hash:    Option<String>,
  pub is_public:        bool,
  pub view_count:       i64,
  pub expires_at:       String,
  pub created_at:       String,
  pub updated_at:       String,
}

impl RawShare {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      share_id:         row.get(0)?,
      owner_id:         row.get(1)?,
      document_id:      row.get(2)?,
      title:            row.get(3)?,
      body:             row.get(4)?,
      references_json:  row.get(5)?,
      parent_share_id:  row.get(6)?,
      require_password: row.get(7)?,
      password_hash:    row.get(8)?,
      is_public:        row.get(9)?,
      view_count:       row.get(10)?,
      expires_at:       row.get(11)?,
      created_at:       row.get(12)?,
      updated_at:       row.get(13)?,
    })
  }

  pub fn into_share(self) -> Result<Share> {
    Ok(Share {
      share_id:        decode_uuid(&self.share_id)?,
      owner_id:        decode_uuid(&self.owner_id)?,
      document_id:     self.document_id,
      title:           self.title,
      body:            self.body,
      references:      decode_references(&self.references_json)?,
      parent_share_id: self.parent_share_id.as_deref().map(decode_uuid).transpose()?,
      access:          decode_access(self.require_password, self.password_hash)?,
      is_public:       self.is_public,
      view_count:      u64::try_from(self.view_count).unwrap_or(0),
      expires_at:      decode_dt(&self.expires_at)?,
      created_at:      decode_dt(&self.created_at)?,
      updated_at:      decode_dt(&self.updated_at)?,
    })
  }
}
