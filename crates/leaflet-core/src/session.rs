//! Session credentials: HS256 JWTs carrying a subject and an expiry.
//!
//! Only HMAC algorithms are accepted when verifying, whatever the token
//! header claims. Expiry is checked against the injected clock rather than
//! the library's wall-clock check.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Minimum accepted length of the signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
  pub sub: String,
  pub iat: i64,
  pub exp: i64,
}

/// Signs and verifies session tokens with a server-held secret.
pub struct SessionKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

impl SessionKeys {
  pub fn new(secret: &[u8], ttl: Duration) -> Result<Self> {
    if secret.len() < MIN_SECRET_LEN {
      return Err(Error::validation(format!(
        "session secret must be at least {MIN_SECRET_LEN} bytes"
      )));
    }
    Ok(Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      ttl,
    })
  }

  pub fn ttl(&self) -> Duration { self.ttl }

  /// Mint a session token for `user_id`, valid from `now` for the ttl.
  pub fn issue(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String> {
    let claims = SessionClaims {
      sub: user_id.to_string(),
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| Error::Crypto(format!("failed to sign session token: {e}")))
  }

  /// Resolve `token` to its subject, or `None` if it is not a valid session
  /// credential (wrong shape, bad signature, foreign algorithm, expired).
  pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Option<Uuid> {
    if token.split('.').count() != 3 {
      return None;
    }

    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.validate_exp = false;
    validation.set_required_spec_claims(&["sub", "exp"]);

    let data = decode::<SessionClaims>(token, &self.decoding, &validation).ok()?;
    if data.claims.exp <= now.timestamp() {
      return None;
    }
    Uuid::parse_str(&data.claims.sub).ok()
  }
}
