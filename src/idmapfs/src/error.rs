use std::io;
use std::num::ParseIntError;

use thiserror::Error;

use crate::idmap::IdKind;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Result type for mount level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for idmapfs.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error, raised before anything is mounted.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The wrapped filesystem failed to initialize.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The mount was already torn down.
    #[error("filesystem is not mounted")]
    NotMounted,
}

/// Malformed id range specifications.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The spec did not have exactly three `:` separated fields.
    #[error("bad format for id map `{spec}`, expected `<host ID>:<container ID>:<size>`")]
    BadFormat { spec: String },

    /// One of the fields is not a non-negative integer.
    #[error("could not read {field} in id map `{spec}`: {source}")]
    BadField {
        spec: String,
        field: &'static str,
        #[source]
        source: ParseIntError,
    },

    /// A range with a size of zero.
    #[error("id map {host_start}:{container_start} has zero size")]
    EmptyRange { host_start: u32, container_start: u32 },

    /// A range running past the largest representable id.
    #[error("id map {host_start}:{container_start}:{size} exceeds the id space")]
    RangeOverflow {
        host_start: u32,
        container_start: u32,
        size: u32,
    },
}

/// A requested id has no covering range.
///
/// This never fails a filesystem operation; decorators fall back to the untranslated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("no {kind} mapping for {id}")]
    NoMapping { kind: IdKind, id: u32 },
}
