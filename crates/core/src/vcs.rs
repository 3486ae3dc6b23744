//! Version-control trait — best-effort commits of deployed files.

use async_trait::async_trait;
use std::path::PathBuf;
use crate::error::VcsError;

#[async_trait]
pub trait VersionControl: Send + Sync {
    fn name(&self) -> &str;

    /// Commit `paths` with `message`. `Ok(false)` means nothing was committed.
    async fn commit_files(&self, paths: &[PathBuf], message: &str) -> Result<bool, VcsError>;
}
