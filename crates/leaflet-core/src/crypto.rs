//! Hashing primitives: argon2 for passwords, SHA-256 for API secrets.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Byte length of a freshly generated API secret (hex-encoded on the wire).
pub const SECRET_BYTES: usize = 32;

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Crypto(format!("argon2 error: {e}")))
}

/// Compare `password` against a PHC string. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(hash) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// One-way digest stored in place of an API secret.
pub fn digest_secret(secret: &str) -> String {
  hex::encode(Sha256::digest(secret.as_bytes()))
}

/// A new random API secret, hex-encoded.
pub fn generate_secret() -> String {
  let mut buf = [0u8; SECRET_BYTES];
  OsRng.fill_bytes(&mut buf);
  hex::encode(buf)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_hash_verifies() {
    let hash = hash_password("hunter22").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("hunter22", &hash));
    assert!(!verify_password("hunter23", &hash));
  }

  #[test]
  fn malformed_hash_never_matches() {
    assert!(!verify_password("anything", "not-a-phc-string"));
    assert!(!verify_password("", ""));
  }

  #[test]
  fn secrets_are_unique_hex() {
    let a = generate_secret();
    let b = generate_secret();
    assert_eq!(a.len(), SECRET_BYTES * 2);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(a, b);
  }

  #[test]
  fn digest_is_stable_sha256() {
    assert_eq!(
      digest_secret("abc"),
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }
}
