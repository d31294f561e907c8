//! # Mention Workspace
//!
//! Resolves `@file:` and `@folder:` tokens against the open workspace and
//! produces completion candidates from the workspace roots.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Workspace Resolution                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  WorkspaceConfig ──► FileSystem ──► FileResolver ──► Reference │
//! │                          │               │                      │
//! │                          ▼               ▼                      │
//! │                   LocalFileSystem     Labeler                   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The filesystem and label collaborators are traits so a host editor can
//! plug in its own virtual filesystem; [`LocalFileSystem`] and
//! [`WorkspaceLabeler`] cover plain directories on disk.

pub mod config;
pub mod error;
pub mod fs;
pub mod labels;
pub mod resolver;

pub use config::WorkspaceConfig;
pub use error::{Result, WorkspaceError};
pub use fs::{EntryKind, FileStat, FileSystem, LocalFileSystem};
pub use labels::{Labeler, WorkspaceLabeler};
pub use resolver::FileResolver;
