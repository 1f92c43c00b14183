//! OAuth2/OIDC Authorization Code + PKCE client engine
//!
//! The client-side state machine for a browser-based login flow with
//! persisted sessions and safe token refresh. The host application owns
//! the browser view and the HTTP transport policy; this crate owns the
//! protocol: anti-forgery/PKCE parameter generation, redirect response
//! validation, token exchange and refresh, and the concurrency discipline
//! that keeps a racing refresh from resurrecting a logged-out session.
//!
//! Flow:
//! 1. [`AuthClient::generate_login_url`] persists the in-flight
//!    [`AuthState`] and returns the authorize URL
//! 2. The host opens the URL and hands the redirect query string to
//!    [`AuthClient::handle_redirect`], which validates, exchanges the
//!    code, and persists a [`StoredUserSession`]
//! 3. [`AuthClient::refresh`] replaces the [`TokenSet`] wholesale;
//!    [`AuthClient::logout`] invalidates the [`Session`] and deletes the
//!    persisted record
//! 4. [`AuthClient::restore_session`] rehydrates a persisted session at
//!    startup

pub mod config;
pub mod error;
pub mod flow;
mod persist;
pub mod pkce;
pub mod query;
pub mod session;
pub mod state;
pub mod token;

pub use config::Config;
pub use error::{HttpError, LoginError, RefreshTokenError, StoreError};
pub use flow::AuthClient;
pub use session::{Session, SessionStore, StoredUserSession, TokenSet};
pub use state::{AuthState, AuthStateStore, MfaType};
pub use token::{HttpTokenExchange, TokenExchange, TokenResponse, TokenResult};
