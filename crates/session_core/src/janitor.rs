use std::path::{Path, PathBuf};

use tracing::{info, warn};

// Removes persisted credentials for both the namespaced layout and the legacy
// un-namespaced one, in parallel. Absent directories are not an error; every
// other failure becomes a warning, never an abort.
pub async fn purge_credentials(auth_dir: &Path, client_id: &str) -> Vec<String> {
    let current = auth_dir.join(format!("session-{client_id}"));
    let legacy = auth_dir.join("session");

    let (current_warning, legacy_warning) = tokio::join!(
        remove_credential_dir(current),
        remove_credential_dir(legacy)
    );

    current_warning.into_iter().chain(legacy_warning).collect()
}

async fn remove_credential_dir(path: PathBuf) -> Option<String> {
    match tokio::fs::remove_dir_all(&path).await {
        Ok(()) => {
            info!(path = %path.display(), "removed credential directory");
            None
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to remove credential directory");
            Some(format!("failed to remove {}: {err}", path.display()))
        }
    }
}
