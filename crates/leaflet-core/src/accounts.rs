//! Registration, login and principal administration.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  Error, Result,
  account::User,
  clock::Clock,
  crypto,
  error::INVALID_LOGIN,
  session::SessionKeys,
  store::PublicationStore,
};

pub const USERNAME_CHARS: std::ops::RangeInclusive<usize> = 3..=100;
pub const PASSWORD_CHARS: std::ops::RangeInclusive<usize> = 6..=200;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
  pub id:       Uuid,
  pub username: String,
  pub email:    String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
  pub id:         Uuid,
  pub username:   String,
  pub email:      String,
  pub is_active:  bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
  pub token: String,
  pub user:  UserSummary,
}

impl From<&User> for UserSummary {
  fn from(user: &User) -> Self {
    Self {
      id:       user.user_id,
      username: user.username.clone(),
      email:    user.email.clone(),
    }
  }
}

impl From<User> for Profile {
  fn from(user: User) -> Self {
    Self {
      id:         user.user_id,
      username:   user.username,
      email:      user.email,
      is_active:  user.is_active,
      created_at: user.created_at,
    }
  }
}

pub struct Accounts<S> {
  store:    Arc<S>,
  sessions: Arc<SessionKeys>,
  clock:    Arc<dyn Clock>,
}

impl<S> Clone for Accounts<S> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      sessions: Arc::clone(&self.sessions),
      clock:    Arc::clone(&self.clock),
    }
  }
}

impl<S: PublicationStore> Accounts<S> {
  pub fn new(store: Arc<S>, sessions: Arc<SessionKeys>, clock: Arc<dyn Clock>) -> Self {
    Self { store, sessions, clock }
  }

  /// Create an active principal. Username and email must both be unused.
  pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<UserSummary> {
    let username = username.trim();
    let email = email.trim();

    if !USERNAME_CHARS.contains(&username.chars().count()) {
      return Err(Error::validation("username must be between 3 and 100 characters"));
    }
    if !email.contains('@') {
      return Err(Error::validation("email address is invalid"));
    }
    if !PASSWORD_CHARS.contains(&password.chars().count()) {
      return Err(Error::validation("password must be between 6 and 200 characters"));
    }

    if self
      .store
      .find_user_by_username(username)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Err(Error::validation("username is already taken"));
    }
    if self
      .store
      .find_user_by_email(email)
      .await
      .map_err(Error::store)?
      .is_some()
    {
      return Err(Error::validation("email is already registered"));
    }

    let now = self.clock.now();
    let user = User {
      user_id:       Uuid::new_v4(),
      username:      username.to_owned(),
      email:         email.to_owned(),
      password_hash: crypto::hash_password(password)?,
      is_active:     true,
      created_at:    now,
      updated_at:    now,
    };
    let summary = UserSummary::from(&user);
    self.store.insert_user(user).await.map_err(Error::store)?;

    tracing::info!(user_id = %summary.id, username = %summary.username, "registered user");
    Ok(summary)
  }

  /// Exchange a username and password for a session token.
  pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
    let user = self
      .store
      .find_user_by_username(username.trim())
      .await
      .map_err(Error::store)?
      .ok_or(Error::Unauthorized(INVALID_LOGIN))?;

    if !user.is_active
      || user.password_hash.is_empty()
      || !crypto::verify_password(password, &user.password_hash)
    {
      return Err(Error::Unauthorized(INVALID_LOGIN));
    }

    let token = self.sessions.issue(user.user_id, self.clock.now())?;
    tracing::info!(user_id = %user.user_id, "user logged in");
    Ok(LoginOutcome { token, user: UserSummary::from(&user) })
  }

  pub async fn me(&self, user_id: Uuid) -> Result<Profile> {
    self
      .store
      .get_user(user_id)
      .await
      .map_err(Error::store)?
      .map(Profile::from)
      .ok_or(Error::NotFound("user"))
  }

  /// Activate or deactivate a principal by username.
  pub async fn set_active(&self, username: &str, active: bool) -> Result<()> {
    let user = self
      .store
      .find_user_by_username(username.trim())
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound("user"))?;
    self
      .store
      .set_user_active(user.user_id, active, self.clock.now())
      .await
      .map_err(Error::store)?;
    tracing::info!(user_id = %user.user_id, active, "changed user activation");
    Ok(())
  }

  pub async fn count_users(&self) -> Result<u64> {
    self.store.count_users().await.map_err(Error::store)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::{clock::ManualClock, testing::MemoryStore};

  fn accounts() -> (Arc<SessionKeys>, Accounts<MemoryStore>) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
    let sessions = Arc::new(
      SessionKeys::new(b"0123456789abcdef0123456789abcdef", Duration::hours(24)).unwrap(),
    );
    let store = Arc::new(MemoryStore::default());
    (sessions.clone(), Accounts::new(store, sessions, clock))
  }

  #[tokio::test]
  async fn register_then_login() {
    let (sessions, accounts) = accounts();
    let user = accounts.register("alice", "alice@example.com", "hunter22").await.unwrap();
    assert_eq!(user.username, "alice");

    let outcome = accounts.login("alice", "hunter22").await.unwrap();
    assert_eq!(outcome.user.id, user.id);
    let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(sessions.verify(&outcome.token, now), Some(user.id));

    let profile = accounts.me(user.id).await.unwrap();
    assert!(profile.is_active);
    assert_eq!(profile.email, "alice@example.com");
    assert_eq!(accounts.count_users().await.unwrap(), 1);
  }

  #[tokio::test]
  async fn registration_rules() {
    let (_, accounts) = accounts();
    for (username, email, password) in [
      ("al", "al@example.com", "hunter22"),
      ("alice", "not-an-email", "hunter22"),
      ("alice", "alice@example.com", "short"),
    ] {
      assert!(matches!(
        accounts.register(username, email, password).await,
        Err(Error::Validation(_))
      ));
    }
  }

  #[tokio::test]
  async fn duplicate_username_or_email_is_rejected() {
    let (_, accounts) = accounts();
    accounts.register("alice", "alice@example.com", "hunter22").await.unwrap();
    assert!(matches!(
      accounts.register("alice", "other@example.com", "hunter22").await,
      Err(Error::Validation(_))
    ));
    assert!(matches!(
      accounts.register("bob", "alice@example.com", "hunter22").await,
      Err(Error::Validation(_))
    ));
  }

  #[tokio::test]
  async fn failed_logins_are_indistinguishable() {
    let (_, accounts) = accounts();
    accounts.register("alice", "alice@example.com", "hunter22").await.unwrap();

    let unknown = accounts.login("nobody", "hunter22").await.unwrap_err();
    let wrong = accounts.login("alice", "wrong-password").await.unwrap_err();
    assert_eq!(unknown.to_string(), wrong.to_string());

    accounts.set_active("alice", false).await.unwrap();
    let inactive = accounts.login("alice", "hunter22").await.unwrap_err();
    assert_eq!(inactive.to_string(), wrong.to_string());
  }

  #[tokio::test]
  async fn set_active_unknown_user() {
    let (_, accounts) = accounts();
    assert!(matches!(
      accounts.set_active("ghost", false).await,
      Err(Error::NotFound("user"))
    ));
  }
}
