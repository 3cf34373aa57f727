use std::{fs::remove_file, path::PathBuf};

/// Removes a socket file once dropped, if enabled.
#[derive(Debug)]
pub(super) struct PathDropGuard {
    pub path: PathBuf,
    pub enabled: bool,
}
impl PathDropGuard {
    pub fn new(path: PathBuf, enabled: bool) -> Self { Self { path, enabled } }
}
impl Drop for PathDropGuard {
    fn drop(&mut self) {
        if self.enabled {
            if let Err(e) = remove_file(&self.path) {
                tracing::debug!(path = %self.path.display(), "could not remove socket file: {e}");
            }
        }
    }
}
