//! Bearer credential resolution and API credential management.
//!
//! A bearer string is tried as a session token first; anything that is not
//! a well-formed, valid session token falls through to an API-secret digest
//! lookup. Every rejection carries the same message regardless of which
//! kind was attempted.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
  Error, Result,
  account::{ApiToken, CredentialKind, IssuedCredential, Principal},
  clock::Clock,
  crypto,
  error::INVALID_CREDENTIAL,
  session::SessionKeys,
  store::PublicationStore,
};

pub const MAX_LABEL_CHARS: usize = 100;

/// What a bearer string turned out to be, before principal checks.
#[derive(Debug, Clone)]
pub enum Credential {
  Session(Uuid),
  ApiToken(ApiToken),
  Unrecognized,
}

pub struct Credentials<S> {
  store:    Arc<S>,
  sessions: Arc<SessionKeys>,
  clock:    Arc<dyn Clock>,
}

impl<S> Clone for Credentials<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      sessions: Arc::clone(&self.sessions),
      clock:    Arc::clone(&self.clock),
    }
  }
}

impl<S> Credentials<S>
where
  S: PublicationStore + 'static,
{
  pub fn new(store: Arc<S>, sessions: Arc<SessionKeys>, clock: Arc<dyn Clock>) -> Self {
    Self { store, sessions, clock }
  }

  // ── Verification ──────────────────────────────────────────────────────

  /// Classify `bearer` without checking the owning principal.
  pub async fn identify(&self, bearer: &str) -> Result<Credential> {
    let bearer = bearer.trim();
    if bearer.is_empty() {
      return Ok(Credential::Unrecognized);
    }

    if let Some(user_id) = self.sessions.verify(bearer, self.clock.now()) {
      return Ok(Credential::Session(user_id));
    }
    tracing::debug!("bearer is not a session token; trying api token");

    let digest = crypto::digest_secret(bearer);
    match self
      .store
      .find_api_token_by_digest(&digest)
      .await
      .map_err(Error::store)?
    {
      Some(token) => Ok(Credential::ApiToken(token)),
      None => Ok(Credential::Unrecognized),
    }
  }

  /// Resolve `bearer` to a principal or a uniform rejection.
  pub async fn verify(&self, bearer: &str) -> Result<Principal> {
    match self.identify(bearer).await? {
      Credential::Session(user_id) => Ok(Principal { user_id, kind: CredentialKind::Session }),
      Credential::ApiToken(token) => {
        let owner = self
          .store
          .get_user(token.owner_id)
          .await
          .map_err(Error::store)?;
        if !owner.is_some_and(|u| u.is_active) {
          return Err(Error::Unauthorized(INVALID_CREDENTIAL));
        }
        self.touch(token.token_id);
        Ok(Principal {
          user_id: token.owner_id,
          kind:    CredentialKind::ApiToken { token_id: token.token_id, label: token.label },
        })
      }
      Credential::Unrecognized => Err(Error::Unauthorized(INVALID_CREDENTIAL)),
    }
  }

  /// Stamp last-used in the background; the outcome is only logged.
  fn touch(&self, token_id: Uuid) {
    let store = Arc::clone(&self.store);
    let at = self.clock.now();
    tokio::spawn(async move {
      if let Err(e) = store.touch_api_token(token_id, at).await {
        tracing::warn!(%token_id, error = %e, "failed to record token use");
      }
    });
  }

  // ── Management ────────────────────────────────────────────────────────

  /// Create a credential for an active owner. The returned secret is the
  /// only copy; only its digest is stored.
  pub async fn issue(&self, owner_id: Uuid, label: &str) -> Result<IssuedCredential> {
    let label = label.trim();
    let chars = label.chars().count();
    if chars == 0 || chars > MAX_LABEL_CHARS {
      return Err(Error::validation(format!(
        "label must be between 1 and {MAX_LABEL_CHARS} characters"
      )));
    }

    let owner = self.store.get_user(owner_id).await.map_err(Error::store)?;
    if !owner.is_some_and(|u| u.is_active) {
      return Err(Error::Unauthorized(INVALID_CREDENTIAL));
    }

    let now = self.clock.now();
    let secret = crypto::generate_secret();
    let token = ApiToken {
      token_id:     Uuid::new_v4(),
      owner_id,
      label:        label.to_owned(),
      digest:       crypto::digest_secret(&secret),
      revoked:      false,
      last_used_at: None,
      created_at:   now,
      updated_at:   now,
    };
    let issued = IssuedCredential {
      id: token.token_id,
      label: token.label.clone(),
      secret,
      created_at: now,
    };

    self.store.insert_api_token(token).await.map_err(Error::store)?;
    tracing::info!(token_id = %issued.id, %owner_id, "issued api token");
    Ok(issued)
  }

  /// Rotate the secret of a live credential, keeping its id and label.
  pub async fn refresh(&self, owner_id: Uuid, token_id: Uuid) -> Result<IssuedCredential> {
    let token = self
      .store
      .get_live_api_token(owner_id, token_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound("token"))?;

    let secret = crypto::generate_secret();
    let replaced = self
      .store
      .replace_api_token_digest(token_id, crypto::digest_secret(&secret), self.clock.now())
      .await
      .map_err(Error::store)?;
    if !replaced {
      return Err(Error::NotFound("token"));
    }

    tracing::info!(%token_id, "refreshed api token");
    Ok(IssuedCredential {
      id: token.token_id,
      label: token.label,
      secret,
      created_at: token.created_at,
    })
  }

  /// Revoke a credential. The row stays, but no longer verifies.
  pub async fn revoke(&self, owner_id: Uuid, token_id: Uuid) -> Result<()> {
    let revoked = self
      .store
      .revoke_api_token(owner_id, token_id, self.clock.now())
      .await
      .map_err(Error::store)?;
    if !revoked {
      return Err(Error::NotFound("token"));
    }
    tracing::info!(%token_id, "revoked api token");
    Ok(())
  }

  pub async fn list(&self, owner_id: Uuid) -> Result<Vec<ApiToken>> {
    self.store.list_api_tokens(owner_id).await.map_err(Error::store)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone, Utc};

  use super::*;
  use crate::{account::User, clock::ManualClock, testing::MemoryStore};

  struct Fixture {
    store:       Arc<MemoryStore>,
    clock:       Arc<ManualClock>,
    sessions:    Arc<SessionKeys>,
    credentials: Credentials<MemoryStore>,
    user:        Uuid,
  }

  async fn fixture() -> Fixture {
    let store = Arc::new(MemoryStore::default());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
    let sessions = Arc::new(
      SessionKeys::new(b"0123456789abcdef0123456789abcdef", Duration::hours(24)).unwrap(),
    );
    let user = Uuid::new_v4();
    store
      .insert_user(User {
        user_id:       user,
        username:      "alice".into(),
        email:         "alice@example.com".into(),
        password_hash: String::new(),
        is_active:     true,
        created_at:    clock.now(),
        updated_at:    clock.now(),
      })
      .await
      .unwrap();
    let credentials = Credentials::new(store.clone(), sessions.clone(), clock.clone());
    Fixture { store, clock, sessions, credentials, user }
  }

  fn assert_rejected(result: Result<Principal>) {
    match result {
      Err(Error::Unauthorized(msg)) => assert_eq!(msg, INVALID_CREDENTIAL),
      other => panic!("expected rejection, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn session_token_resolves_to_subject() {
    let f = fixture().await;
    let token = f.sessions.issue(f.user, f.clock.now()).unwrap();
    let principal = f.credentials.verify(&token).await.unwrap();
    assert_eq!(principal, Principal { user_id: f.user, kind: CredentialKind::Session });
  }

  #[tokio::test]
  async fn expired_session_is_rejected() {
    let f = fixture().await;
    let token = f.sessions.issue(f.user, f.clock.now()).unwrap();
    f.clock.advance(Duration::hours(25));
    assert_rejected(f.credentials.verify(&token).await);
  }

  #[tokio::test]
  async fn issued_secret_verifies_and_only_digest_is_stored() {
    let f = fixture().await;
    let issued = f.credentials.issue(f.user, "cli").await.unwrap();

    let stored = f.store.token(issued.id).unwrap();
    assert_eq!(stored.digest, crypto::digest_secret(&issued.secret));
    assert_ne!(stored.digest, issued.secret);

    let principal = f.credentials.verify(&issued.secret).await.unwrap();
    assert_eq!(principal.user_id, f.user);
    assert_eq!(
      principal.kind,
      CredentialKind::ApiToken { token_id: issued.id, label: "cli".into() }
    );
  }

  #[tokio::test]
  async fn revoked_credential_is_rejected_though_row_remains() {
    let f = fixture().await;
    let issued = f.credentials.issue(f.user, "cli").await.unwrap();
    f.credentials.revoke(f.user, issued.id).await.unwrap();

    assert!(f.store.token(issued.id).unwrap().revoked);
    assert_rejected(f.credentials.verify(&issued.secret).await);
    assert!(matches!(
      f.credentials.revoke(f.user, issued.id).await,
      Err(Error::NotFound(_))
    ));
    assert!(matches!(
      f.credentials.refresh(f.user, issued.id).await,
      Err(Error::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn refresh_rotates_secret() {
    let f = fixture().await;
    let issued = f.credentials.issue(f.user, "cli").await.unwrap();
    let refreshed = f.credentials.refresh(f.user, issued.id).await.unwrap();

    assert_eq!(refreshed.id, issued.id);
    assert_eq!(refreshed.label, "cli");
    assert_ne!(refreshed.secret, issued.secret);
    assert_rejected(f.credentials.verify(&issued.secret).await);
    f.credentials.verify(&refreshed.secret).await.unwrap();
  }

  #[tokio::test]
  async fn other_owner_cannot_manage_credential() {
    let f = fixture().await;
    let issued = f.credentials.issue(f.user, "cli").await.unwrap();
    let stranger = Uuid::new_v4();
    assert!(matches!(
      f.credentials.refresh(stranger, issued.id).await,
      Err(Error::NotFound(_))
    ));
    assert!(matches!(
      f.credentials.revoke(stranger, issued.id).await,
      Err(Error::NotFound(_))
    ));
  }

  #[tokio::test]
  async fn inactive_owner_invalidates_credential() {
    let f = fixture().await;
    let issued = f.credentials.issue(f.user, "cli").await.unwrap();
    f.store.set_user_active(f.user, false, f.clock.now()).await.unwrap();

    assert_rejected(f.credentials.verify(&issued.secret).await);
    assert!(matches!(
      f.credentials.issue(f.user, "another").await,
      Err(Error::Unauthorized(_))
    ));
  }

  #[tokio::test]
  async fn unknown_and_malformed_bearers_are_rejected_uniformly() {
    let f = fixture().await;
    for bearer in ["", "   ", "nonsense", "a.b.c", "x.y"] {
      assert_rejected(f.credentials.verify(bearer).await);
    }
  }

  #[tokio::test]
  async fn label_is_validated() {
    let f = fixture().await;
    assert!(matches!(f.credentials.issue(f.user, " ").await, Err(Error::Validation(_))));
    let long = "l".repeat(MAX_LABEL_CHARS + 1);
    assert!(matches!(f.credentials.issue(f.user, &long).await, Err(Error::Validation(_))));
  }

  #[tokio::test]
  async fn list_never_exposes_secret() {
    let f = fixture().await;
    let a = f.credentials.issue(f.user, "a").await.unwrap();
    let b = f.credentials.issue(f.user, "b").await.unwrap();
    let listed = f.credentials.list(f.user).await.unwrap();

    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].token_id, b.id);
    for token in &listed {
      assert_ne!(token.digest, a.secret);
      assert_ne!(token.digest, b.secret);
    }
  }

  #[tokio::test]
  async fn api_token_use_is_stamped_in_background() {
    let f = fixture().await;
    let issued = f.credentials.issue(f.user, "cli").await.unwrap();
    f.credentials.verify(&issued.secret).await.unwrap();

    for _ in 0..50 {
      if f.store.token(issued.id).unwrap().last_used_at.is_some() {
        return;
      }
      tokio::task::yield_now().await;
    }
    panic!("last_used_at was never recorded");
  }
}
