//! JSON REST API for Leaflet.
//!
//! Exposes an axum [`Router`] backed by any
//! [`leaflet_core::store::PublicationStore`]. TLS and process concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! axum::serve(listener, leaflet_api::api_router(state)).await?;
//! ```

pub mod accounts;
pub mod auth;
pub mod base_url;
pub mod error;
pub mod extract;
pub mod health;
pub mod shares;
pub mod tokens;
pub mod view;

use std::sync::Arc;

use axum::{
  Router,
  http::{HeaderName, Method, header},
  routing::{delete, get, post},
};
use leaflet_core::{
  accounts::Accounts, clock::Clock, credentials::Credentials, lifecycle::Shares,
  session::SessionKeys, store::PublicationStore,
};
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Settings the HTTP layer needs from the server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// Public URL prefix used when no proxy header names one.
  pub base_url: String,
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub shares:      Shares<S>,
  pub credentials: Credentials<S>,
  pub accounts:    Accounts<S>,
  pub config:      Arc<ApiConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      shares:      self.shares.clone(),
      credentials: self.credentials.clone(),
      accounts:    self.accounts.clone(),
      config:      Arc::clone(&self.config),
    }
  }
}

impl<S> AppState<S>
where
  S: PublicationStore + 'static,
{
  /// Wire every service to the same store, signing keys and clock.
  pub fn new(
    store: Arc<S>,
    sessions: Arc<SessionKeys>,
    clock: Arc<dyn Clock>,
    config: ApiConfig,
  ) -> Self {
    Self {
      shares:      Shares::new(Arc::clone(&store), Arc::clone(&clock)),
      credentials: Credentials::new(Arc::clone(&store), Arc::clone(&sessions), Arc::clone(&clock)),
      accounts:    Accounts::new(store, sessions, clock),
      config:      Arc::new(config),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full `/api` router for `state`, with CORS and request tracing.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: PublicationStore + 'static,
{
  let routes = Router::new()
    // Accounts
    .route("/auth/register", post(accounts::register::<S>))
    .route("/auth/login", post(accounts::login::<S>))
    .route("/auth/health", get(health::authenticated::<S>))
    .route("/user/me", get(accounts::me::<S>))
    // Shares
    .route("/share/create", post(shares::create::<S>))
    .route("/share/list", get(shares::list::<S>))
    .route("/share/batch", delete(shares::batch_delete::<S>))
    .route("/share/{id}", delete(shares::delete_one::<S>))
    // API tokens
    .route("/token/list", get(tokens::list::<S>))
    .route("/token/create", post(tokens::create::<S>))
    .route("/token/refresh/{id}", post(tokens::refresh::<S>))
    .route("/token/revoke/{id}", post(tokens::revoke::<S>))
    // Public
    .route("/s/{id}", get(view::handler::<S>))
    .route("/health", get(health::public::<S>))
    .with_state(state);

  Router::new()
    .nest("/api", routes)
    .layer(cors())
    .layer(TraceLayer::new_for_http())
}

fn cors() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
    .allow_headers([
      header::CONTENT_TYPE,
      header::AUTHORIZATION,
      HeaderName::from_static(base_url::X_BASE_URL),
    ])
}
