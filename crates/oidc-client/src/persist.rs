//! Atomic JSON persistence shared by the auth-state and session stores
//!
//! Both stores hold secret material (PKCE verifier, OAuth tokens), so
//! files are written 0600 and replaced atomically (temp file + rename)
//! to prevent corruption if the process dies mid-write.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::StoreError;

/// Serialize `data` as JSON and atomically replace the file at `path`.
pub(crate) async fn write_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| StoreError::Parse(format!("serializing store file: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| StoreError::Io("store path has no parent directory".into()))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| StoreError::Io(format!("creating store directory: {e}")))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("store");
    let tmp_path = dir.join(format!(".{file_name}.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| StoreError::Io(format!("writing temp store file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| StoreError::Io(format!("setting store file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| StoreError::Io(format!("renaming temp store file: {e}")))?;

    debug!(path = %path.display(), "persisted store file");
    Ok(())
}

/// Read and deserialize the JSON file at `path`.
///
/// A missing file is a cold start, not an error: returns `None`.
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::Io(format!("reading store file: {e}")))?;
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| StoreError::Parse(format!("parsing store file: {e}")))
}
