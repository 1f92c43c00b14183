//! Client configuration and loading
//!
//! The engine is embedded by a host application, so configuration can be
//! constructed directly or loaded from a TOML file (path resolution:
//! explicit path > `OIDC_CONFIG_PATH` env var > default file name).
//! The client id is a public identifier under PKCE, not a secret.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// OAuth client configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Authorization server base URL, e.g. `https://login.example.com`
    pub server_url: String,
    /// Public OAuth client identifier registered with the server
    pub client_id: String,
    /// Redirect URI the authorization server sends the browser back to
    pub redirect_uri: String,
    /// Directory holding the persisted auth-state and session files
    pub storage_dir: PathBuf,
}

impl Config {
    /// Construct a validated configuration directly (embedding hosts).
    pub fn new(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        storage_dir: impl Into<PathBuf>,
    ) -> common::Result<Self> {
        let config = Config {
            server_url: server_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            storage_dir: storage_dir.into(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the config file path from an explicit argument or the
    /// `OIDC_CONFIG_PATH` env var, falling back to `oidc-client.toml`.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        if let Some(p) = explicit {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("OIDC_CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("oidc-client.toml")
    }

    /// Authorization endpoint derived from the server base URL.
    pub fn authorize_endpoint(&self) -> String {
        format!("{}/oauth/authorize", self.server_url.trim_end_matches('/'))
    }

    /// Token endpoint derived from the server base URL.
    pub fn token_endpoint(&self) -> String {
        format!("{}/oauth/token", self.server_url.trim_end_matches('/'))
    }

    fn validate(&self) -> common::Result<()> {
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "server_url must start with http:// or https://, got: {}",
                self.server_url
            )));
        }
        if self.client_id.is_empty() {
            return Err(common::Error::Config("client_id must not be empty".into()));
        }
        // Custom app schemes (com.example.app:/callback) are legitimate
        // redirect targets, so only emptiness is rejected here.
        if self.redirect_uri.is_empty() {
            return Err(common::Error::Config(
                "redirect_uri must not be empty".into(),
            ));
        }
        Ok(())
    }
}
