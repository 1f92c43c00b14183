//! In-flight authentication state
//!
//! One login attempt may be outstanding at a time: the store is a single
//! slot, and starting a new flow overwrites whatever was pending. The
//! slot is consumed exactly once, by the first redirect whose `state`
//! matches. The file backing survives a process restart, which matters
//! because the browser round-trip can outlive the process that started it.

use std::path::PathBuf;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreError;
use crate::persist;

/// Requested multi-factor method, carried on the wire as `acr_values`.
///
/// Mutually exclusive with the default account-chooser prompt: a login URL
/// carries either `acr_values` or `prompt=select_account`, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MfaType {
    Otp,
}

impl MfaType {
    /// Wire value for the `acr_values` query parameter.
    pub fn acr_value(&self) -> &'static str {
        match self {
            MfaType::Otp => "otp",
        }
    }
}

/// Anti-forgery and PKCE parameters for one in-flight login attempt.
///
/// `state` binds the redirect to this attempt, `nonce` binds the issued
/// id token, and `code_verifier` is the PKCE secret revealed only during
/// token exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthState {
    pub state: String,
    pub nonce: String,
    pub code_verifier: Secret<String>,
    pub mfa: Option<MfaType>,
}

/// Single-slot, file-backed store for the in-flight [`AuthState`].
///
/// The Mutex serializes slot access; writes go through the shared atomic
/// JSON persistence (temp file + rename, 0600 - the verifier is secret
/// material). Last write wins, no reference counting: overwriting
/// abandons the previous attempt.
pub struct AuthStateStore {
    path: PathBuf,
    slot: Mutex<Option<AuthState>>,
}

impl AuthStateStore {
    /// Open the store at the given file path.
    ///
    /// A missing file is a cold start: no login attempt is pending.
    pub async fn load(path: PathBuf) -> Result<Self, StoreError> {
        let slot: Option<AuthState> = persist::read_json(&path).await?.flatten();
        if slot.is_some() {
            debug!(path = %path.display(), "loaded pending auth state");
        }
        Ok(Self {
            path,
            slot: Mutex::new(slot),
        })
    }

    /// Store a new in-flight attempt, overwriting any pending one.
    pub async fn set(&self, state: AuthState) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().await;
        *slot = Some(state);
        persist::write_atomic(&self.path, &*slot).await
    }

    /// Clone the pending attempt, if any.
    pub async fn get(&self) -> Option<AuthState> {
        self.slot.lock().await.clone()
    }

    /// Clear the pending attempt. Idempotent.
    pub async fn remove(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().await;
        if slot.take().is_some() {
            debug!("cleared pending auth state");
            persist::write_atomic(&self.path, &*slot).await?;
        }
        Ok(())
    }
}
