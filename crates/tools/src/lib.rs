//! Collaborator implementations for Autoforge.
//!
//! These give the pipeline and scheduler their reach into the world:
//! search the web, write files into the workspace, run install commands,
//! and commit the result.

pub mod git;
pub mod shell;
pub mod web_search;
pub mod workspace;

pub use git::GitVersionControl;
pub use shell::CommandRunner;
pub use web_search::{HttpSearch, NoopSearch};
pub use workspace::{WorkspaceError, WorkspaceWriter};
