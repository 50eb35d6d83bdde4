//! Share types: a published, addressable snapshot of a document.
//!
//! At most one *active* share exists per `(owner_id, document_id)`; expired
//! and soft-deleted rows may linger but are never reused.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Access ──────────────────────────────────────────────────────────────────

/// How a share is gated. A protected share always carries a hash, so the
/// "password required but no hash" state cannot be constructed.
#[derive(Clone, PartialEq, Eq)]
pub enum Access {
  Open,
  /// Argon2 PHC string of the gate password.
  Password(String),
}

impl Access {
  pub fn requires_password(&self) -> bool { matches!(self, Self::Password(_)) }

  pub fn password_hash(&self) -> Option<&str> {
    match self {
      Self::Open => None,
      Self::Password(hash) => Some(hash),
    }
  }
}

impl fmt::Debug for Access {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Open => f.write_str("Open"),
      Self::Password(_) => f.write_str("Password(<redacted>)"),
    }
  }
}

// ─── Block references ────────────────────────────────────────────────────────

/// A referenced block supplied alongside the content at publish time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockReference {
  pub block_id:     String,
  /// Raw content of the referenced block.
  #[serde(default)]
  pub content:      String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub display_text: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ref_count:    Option<u32>,
}

impl BlockReference {
  /// The explicit display text, treating an empty string as absent.
  pub fn display_text(&self) -> Option<&str> {
    self.display_text.as_deref().filter(|t| !t.is_empty())
  }
}

// ─── Share ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Share {
  pub share_id:        Uuid,
  pub owner_id:        Uuid,
  /// Source document id; for child shares, the referenced block id.
  pub document_id:     String,
  pub title:           String,
  pub body:            String,
  pub references:      Vec<BlockReference>,
  /// Set when this share was derived from a block referenced by another.
  pub parent_share_id: Option<Uuid>,
  pub access:          Access,
  /// Descriptive only; gating is done by `access` and `expires_at`.
  pub is_public:       bool,
  pub view_count:      u64,
  pub expires_at:      DateTime<Utc>,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

impl Share {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

// ─── Operation inputs and outputs ────────────────────────────────────────────

/// Input to [`crate::lifecycle::Shares::publish`].
#[derive(Debug, Clone, Default)]
pub struct PublishRequest {
  pub document_id:   String,
  pub title:         String,
  pub body:          String,
  pub want_password: bool,
  pub password:      Option<String>,
  pub is_public:     bool,
  /// Lifetime in days, `1..=365`.
  pub expire_days:   u32,
  pub references:    Vec<BlockReference>,
}

#[derive(Debug, Clone)]
pub struct Published {
  pub share:  Share,
  /// `true` when an existing active share was updated in place.
  pub reused: bool,
}

/// What a viewer receives after the expiry and password gates.
#[derive(Debug, Clone)]
pub struct SharedView {
  pub share_id:          Uuid,
  pub title:             String,
  /// Body with block references rewritten.
  pub body:              String,
  pub password_required: bool,
  pub expires_at:        DateTime<Utc>,
  pub view_count:        u64,
  pub created_at:        DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items:     Vec<T>,
  pub page:      u32,
  pub page_size: u32,
  pub total:     u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchDeleteOutcome {
  /// An empty id list deletes every share the owner has.
  All { deleted: u64 },
  Partial {
    deleted:   Vec<String>,
    not_found: Vec<String>,
    /// Id → failure reason.
    failed:    Vec<(String, String)>,
  },
}
