//! Range based translation between host and container user/group ids.
//!
//! An [`IdentityMapping`] holds two ordered lists of [`IdRange`], one for uids and one for gids.
//! It is built once from configuration and shared read-only by every decorator of a mount, so
//! lookups need no synchronization.
//!
//! A translation succeeds only when *both* the uid and the gid of an [`Identity`] fall inside a
//! configured range. There is no partial result: if one component is unmapped the whole lookup
//! fails with [`MappingError::NoMapping`]. Callers that want to degrade gracefully (see
//! [`crate::translator::Translator`]) keep the original identity in that case.

use std::fmt;

use libc::{gid_t, uid_t};
use log::warn;

use crate::error::{ConfigError, MappingError};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// One past the largest representable id.
const ID_SPACE_END: u64 = u32::MAX as u64 + 1;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Filesystem ownership, a `(uid, gid)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Identity {
    /// The user id.
    pub uid: uid_t,

    /// The group id.
    pub gid: gid_t,
}

/// Which half of an [`Identity`] a lookup was working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// User id.
    Uid,

    /// Group id.
    Gid,
}

/// A contiguous block mapping container ids `[container_start, container_start + size)` onto host
/// ids `[host_start, host_start + size)` element-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    host_start: u32,
    container_start: u32,
    size: u32,
}

/// Immutable, bidirectional uid/gid translator.
///
/// Within each list the first matching range wins. Overlapping ranges are accepted (a warning is
/// logged when the mapping is built) so that precedence is always list order, never undefined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityMapping {
    uids: Vec<IdRange>,
    gids: Vec<IdRange>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Identity {
    /// Creates a new identity.
    pub fn new(uid: uid_t, gid: gid_t) -> Self {
        Self { uid, gid }
    }
}

impl IdRange {
    /// Creates a range, rejecting empty ranges and ranges that run past the end of the 32-bit id
    /// space on either side.
    pub fn new(host_start: u32, container_start: u32, size: u32) -> Result<Self, ConfigError> {
        if size == 0 {
            return Err(ConfigError::EmptyRange {
                host_start,
                container_start,
            });
        }

        if host_start as u64 + size as u64 > ID_SPACE_END
            || container_start as u64 + size as u64 > ID_SPACE_END
        {
            return Err(ConfigError::RangeOverflow {
                host_start,
                container_start,
                size,
            });
        }

        Ok(Self {
            host_start,
            container_start,
            size,
        })
    }

    /// First host id covered by this range.
    pub fn host_start(&self) -> u32 {
        self.host_start
    }

    /// First container id covered by this range.
    pub fn container_start(&self) -> u32 {
        self.container_start
    }

    /// Number of ids covered by this range.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns true if `id` lies in the container side of this range.
    pub fn contains_container(&self, id: u32) -> bool {
        Self::covers(self.container_start, self.size, id)
    }

    /// Returns true if `id` lies in the host side of this range.
    pub fn contains_host(&self, id: u32) -> bool {
        Self::covers(self.host_start, self.size, id)
    }

    /// Translates a container id to its host counterpart, if this range covers it.
    pub fn to_host(&self, id: u32) -> Option<u32> {
        self.contains_container(id)
            .then(|| self.host_start + (id - self.container_start))
    }

    /// Translates a host id to its container counterpart, if this range covers it.
    pub fn to_container(&self, id: u32) -> Option<u32> {
        self.contains_host(id)
            .then(|| self.container_start + (id - self.host_start))
    }

    fn covers(start: u32, size: u32, id: u32) -> bool {
        id >= start && (id as u64) < start as u64 + size as u64
    }

    fn overlaps(&self, other: &IdRange) -> bool {
        let intersects = |a: u32, b: u32| {
            let (a, b, n, m) = (a as u64, b as u64, self.size as u64, other.size as u64);
            a < b + m && b < a + n
        };

        intersects(self.container_start, other.container_start)
            || intersects(self.host_start, other.host_start)
    }
}

impl IdentityMapping {
    /// Builds a mapping from ordered uid and gid range lists.
    ///
    /// Empty lists are legitimate: every lookup against them fails with `NoMapping`.
    pub fn new(uids: Vec<IdRange>, gids: Vec<IdRange>) -> Self {
        warn_overlaps(IdKind::Uid, &uids);
        warn_overlaps(IdKind::Gid, &gids);
        Self { uids, gids }
    }

    /// The uid ranges in precedence order.
    pub fn uid_ranges(&self) -> &[IdRange] {
        &self.uids
    }

    /// The gid ranges in precedence order.
    pub fn gid_ranges(&self) -> &[IdRange] {
        &self.gids
    }

    /// Returns true if neither uids nor gids have any range configured.
    pub fn is_empty(&self) -> bool {
        self.uids.is_empty() && self.gids.is_empty()
    }

    /// Translates a container-space identity into host space.
    ///
    /// Fails unless both the uid and the gid are covered by a range.
    pub fn to_host(&self, id: Identity) -> Result<Identity, MappingError> {
        let uid = lookup(&self.uids, IdKind::Uid, id.uid, IdRange::to_host)?;
        let gid = lookup(&self.gids, IdKind::Gid, id.gid, IdRange::to_host)?;
        Ok(Identity { uid, gid })
    }

    /// Translates a host-space identity into container space.
    ///
    /// Fails unless both the uid and the gid are covered by a range.
    pub fn to_container(&self, id: Identity) -> Result<Identity, MappingError> {
        let uid = lookup(&self.uids, IdKind::Uid, id.uid, IdRange::to_container)?;
        let gid = lookup(&self.gids, IdKind::Gid, id.gid, IdRange::to_container)?;
        Ok(Identity { uid, gid })
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn lookup(
    ranges: &[IdRange],
    kind: IdKind,
    id: u32,
    translate: fn(&IdRange, u32) -> Option<u32>,
) -> Result<u32, MappingError> {
    ranges
        .iter()
        .find_map(|range| translate(range, id))
        .ok_or(MappingError::NoMapping { kind, id })
}

fn warn_overlaps(kind: IdKind, ranges: &[IdRange]) {
    for (i, first) in ranges.iter().enumerate() {
        for second in &ranges[i + 1..] {
            if first.overlaps(second) {
                warn!("{kind} range {first} overlaps {second}, the earlier range takes precedence");
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.uid, self.gid)
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::Uid => write!(f, "uid"),
            IdKind::Gid => write!(f, "gid"),
        }
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.host_start, self.container_start, self.size)
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
