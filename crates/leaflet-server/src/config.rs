//! Runtime configuration, deserialised from `config.toml` and `LEAFLET_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:              String,
  #[serde(default = "default_port")]
  pub port:              u16,
  /// Share-link prefix when no proxy header supplies one.
  #[serde(default = "default_base_url")]
  pub base_url:          String,
  #[serde(default = "default_store_path")]
  pub store_path:        PathBuf,
  /// HMAC key for session tokens; at least 32 bytes.
  pub session_secret:    String,
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours: i64,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_base_url() -> String { "http://localhost:8080".into() }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/leaflet/leaflet.db") }
fn default_session_ttl_hours() -> i64 { 24 }

impl ServerConfig {
  /// Layer the optional file at `path` under the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("LEAFLET"))
      .build()
      .context("failed to read config file")?;

    let mut cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
