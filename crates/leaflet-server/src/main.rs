//! Leaflet server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `LEAFLET_*` environment variables, opens the SQLite store and serves the
//! JSON API over HTTP. Account administration runs as subcommands against
//! the same store.
//!
//! ```text
//! leaflet serve
//! leaflet create-user alice alice@example.com --token laptop
//! leaflet set-active alice --inactive
//! ```

mod config;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use leaflet_api::{ApiConfig, AppState};
use leaflet_core::{
  accounts::Accounts,
  clock::{Clock, SystemClock},
  credentials::Credentials,
  session::SessionKeys,
};
use leaflet_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Leaflet document publishing server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Register a user; the password is read from stdin.
  CreateUser {
    username: String,
    email:    String,
    /// Also issue an API token with this label and print its secret.
    #[arg(long)]
    token:    Option<String>,
  },
  /// Activate or deactivate a user.
  SetActive {
    username: String,
    #[arg(long)]
    inactive: bool,
  },
}

/// Everything a command needs, opened once from the configuration.
struct Services {
  config:   ServerConfig,
  store:    Arc<SqliteStore>,
  sessions: Arc<SessionKeys>,
  clock:    Arc<dyn Clock>,
}

impl Services {
  async fn open(config: ServerConfig) -> anyhow::Result<Self> {
    let sessions = SessionKeys::new(
      config.session_secret.as_bytes(),
      chrono::Duration::hours(config.session_ttl_hours),
    )
    .context("invalid session_secret")?;

    if let Some(parent) = config.store_path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {parent:?}"))?;
    }
    let store = SqliteStore::open(&config.store_path)
      .await
      .with_context(|| format!("failed to open store at {:?}", config.store_path))?;

    Ok(Self {
      config,
      store: Arc::new(store),
      sessions: Arc::new(sessions),
      clock: Arc::new(SystemClock),
    })
  }

  fn accounts(&self) -> Accounts<SqliteStore> {
    Accounts::new(self.store.clone(), self.sessions.clone(), self.clock.clone())
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let config = ServerConfig::load(&cli.config)?;
  let services = Services::open(config).await?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(services).await,
    Command::CreateUser { username, email, token } => {
      create_user(&services, &username, &email, token.as_deref()).await
    }
    Command::SetActive { username, inactive } => {
      services.accounts().set_active(&username, !inactive).await?;
      println!("{username} is now {}", if inactive { "inactive" } else { "active" });
      Ok(())
    }
  }
}

async fn serve(services: Services) -> anyhow::Result<()> {
  let address = services.config.address();
  let state = AppState::new(
    services.store,
    services.sessions,
    services.clock,
    ApiConfig { base_url: services.config.base_url.clone() },
  );
  let app = leaflet_api::api_router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;
  Ok(())
}

async fn create_user(
  services: &Services,
  username: &str,
  email: &str,
  token_label: Option<&str>,
) -> anyhow::Result<()> {
  let password = read_password()?;
  let user = services.accounts().register(username, email, &password).await?;
  println!("created user {} ({})", user.username, user.id);

  if let Some(label) = token_label {
    let credentials =
      Credentials::new(services.store.clone(), services.sessions.clone(), services.clock.clone());
    let issued = credentials.issue(user.id, label).await?;
    println!("api token {} ({}): {}", issued.label, issued.id, issued.secret);
    println!("store this secret now; it cannot be shown again");
  }
  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  let stdin = io::stdin();
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  stdin.lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}
