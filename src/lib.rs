//! Canopy: Hierarchical Repository Export
//!
//! Snapshots a hierarchical metadata repository (folders containing typed
//! resources) onto the local filesystem as a mirrored tree of descriptor and
//! content files.

pub mod config;
pub mod content;
pub mod directory;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod serializer;
pub mod session;
pub mod summary;
pub mod tooling;
pub mod types;
pub mod walker;

pub use error::ExportError;
pub use summary::ExportSummary;
pub use walker::{run, ExportContext, ExportWalker};
