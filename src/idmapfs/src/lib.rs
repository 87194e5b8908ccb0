//! idmapfs - uid/gid translating decorators for filesystem implementations.
//!
//! Processes using a mount see ownership in *container space* while the backing filesystem
//! records it in *host space*. A [`MappedNode`] sits between the two: it unmaps the caller's
//! identity before every request, maps the ownership of returned attributes back, and translates
//! `chown` targets. Files opened through it are wrapped in a [`MappedFile`].
//!
//! Translation is all-or-nothing per identity: both the uid and the gid must be covered by a
//! configured range. Ids without a mapping are passed through untranslated; a missing mapping
//! never fails a filesystem call.
//!
//! # Example
//!
//! ```rust,no_run
//! use idmapfs::{Config, MountHandle, Node};
//!
//! struct Backend;
//!
//! impl Node for Backend {
//!     // ... implement the operations the backend supports
//! }
//!
//! fn main() -> idmapfs::Result<()> {
//!     let config = Config::from_specs(["100000:0:65536"], ["100000:0:65536"])?.debug(true);
//!     let mount = MountHandle::new(Backend, &config)?;
//!
//!     // hand `mount.root()` to the filesystem framework, then on shutdown:
//!     mount.unmount()
//! }
//! ```

//--------------------------------------------------------------------------------------------------
// Modules
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod error;
pub mod file;
pub mod filesystem;
pub mod idmap;
pub mod mount;
pub mod node;
pub mod trace;
pub mod translator;

#[cfg(test)]
mod tests;

//--------------------------------------------------------------------------------------------------
// Re-Exports
//--------------------------------------------------------------------------------------------------

pub use config::Config;
pub use error::{ConfigError, Error, MappingError, Result};
pub use file::MappedFile;
pub use filesystem::{Attr, Context, DirEntry, Entry, File, FileLock, Inode, Node, StatFs, ROOT_ID};
pub use idmap::{IdKind, IdRange, Identity, IdentityMapping};
pub use mount::MountHandle;
pub use node::MappedNode;
pub use trace::TraceSink;
pub use translator::Translator;
