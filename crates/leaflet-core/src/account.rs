//! Principals and their API credentials.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered principal. Deactivation blocks logins, credential issuance
/// and any further use of that principal's API credentials.
#[derive(Debug, Clone)]
pub struct User {
  pub user_id:       Uuid,
  pub username:      String,
  pub email:         String,
  pub password_hash: String,
  pub is_active:     bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// A long-lived API credential. Only the SHA-256 digest of the secret is
/// persisted; the secret itself is handed out once.
#[derive(Debug, Clone)]
pub struct ApiToken {
  pub token_id:     Uuid,
  pub owner_id:     Uuid,
  pub label:        String,
  pub digest:       String,
  pub revoked:      bool,
  pub last_used_at: Option<DateTime<Utc>>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

/// The only place a plaintext secret ever appears.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCredential {
  pub id:         Uuid,
  pub label:      String,
  pub secret:     String,
  pub created_at: DateTime<Utc>,
}

/// How a request was authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialKind {
  Session,
  ApiToken { token_id: Uuid, label: String },
}

/// A resolved caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
  pub user_id: Uuid,
  pub kind:    CredentialKind,
}
