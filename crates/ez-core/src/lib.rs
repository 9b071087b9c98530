//! EZ Core - Shared functionality for the EZ infrastructure tools
//!
//! Path layout, status output, and subprocess plumbing used by every
//! command group.

pub mod exec;
pub mod format;
pub mod paths;

pub use paths::ProjectPaths;
