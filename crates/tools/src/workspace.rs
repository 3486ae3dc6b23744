//! Workspace writer — write generated files under a fixed root.
//!
//! Paths come from model output, so they are validated before touching the
//! filesystem: absolute paths and any `..` component are refused.

use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Error returned when a file cannot be placed in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("Empty path")]
    EmptyPath,

    #[error("Path '{path}' is absolute")]
    AbsolutePath { path: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to write '{path}': {reason}")]
    WriteFailed { path: String, reason: String },
}

pub struct WorkspaceWriter {
    root: PathBuf,
}

impl WorkspaceWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` against the workspace root.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, WorkspaceError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(WorkspaceError::EmptyPath);
        }

        let normalized = trimmed.replace('\\', "/");
        let relative = Path::new(&normalized);
        if normalized.starts_with('/') || relative.is_absolute() || relative.has_root() {
            return Err(WorkspaceError::AbsolutePath { path: path.into() });
        }

        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(WorkspaceError::PathTraversal { path: path.into() });
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(WorkspaceError::AbsolutePath { path: path.into() });
                }
            }
        }

        if resolved == self.root {
            return Err(WorkspaceError::EmptyPath);
        }
        Ok(resolved)
    }

    /// Write `content` to `path`, creating parent directories.
    pub async fn write(&self, path: &str, content: &str) -> Result<PathBuf, WorkspaceError> {
        let target = self.resolve(path)?;
        let write_failed = |e: std::io::Error| WorkspaceError::WriteFailed {
            path: path.to_string(),
            reason: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_failed)?;
        }
        tokio::fs::write(&target, content).await.map_err(write_failed)?;

        debug!(path = %target.display(), bytes = content.len(), "File written");
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_resolve_under_root() {
        let writer = WorkspaceWriter::new("/srv/workspace");
        assert_eq!(
            writer.resolve("src/validate.py").unwrap(),
            PathBuf::from("/srv/workspace/src/validate.py")
        );
        assert_eq!(
            writer.resolve("./README.md").unwrap(),
            PathBuf::from("/srv/workspace/README.md")
        );
    }

    #[test]
    fn traversal_refused() {
        let writer = WorkspaceWriter::new("/srv/workspace");
        assert!(matches!(
            writer.resolve("../outside.txt"),
            Err(WorkspaceError::PathTraversal { .. })
        ));
        assert!(matches!(
            writer.resolve("src/../../etc/passwd"),
            Err(WorkspaceError::PathTraversal { .. })
        ));
        assert!(matches!(
            writer.resolve("..\\windows\\evil"),
            Err(WorkspaceError::PathTraversal { .. })
        ));
    }

    #[test]
    fn absolute_refused() {
        let writer = WorkspaceWriter::new("/srv/workspace");
        assert!(matches!(
            writer.resolve("/etc/passwd"),
            Err(WorkspaceError::AbsolutePath { .. })
        ));
    }

    #[test]
    fn empty_refused() {
        let writer = WorkspaceWriter::new("/srv/workspace");
        assert!(matches!(writer.resolve("  "), Err(WorkspaceError::EmptyPath)));
        assert!(matches!(writer.resolve("."), Err(WorkspaceError::EmptyPath)));
    }

    #[tokio::test]
    async fn write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let writer = WorkspaceWriter::new(dir.path());

        let path = writer.write("pkg/sub/mod.py", "print('hi')\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "print('hi')\n");
    }
}
