//! Id mapping configuration.
//!
//! Ranges are written as `<hostID>:<containerID>:<size>`, e.g. `100000:0:65536` maps container
//! ids `0..65536` onto host ids `100000..165536`. Everything here is validated before a mount is
//! created, so the runtime translation code never sees a malformed range.

use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::idmap::{IdRange, IdentityMapping};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Configuration options for an id mapped mount.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// The uid ranges, in precedence order. The first range covering an id is used.
    ///
    /// The default is empty, meaning no uid is ever translated.
    pub uid_maps: Vec<IdRange>,

    /// The gid ranges, in precedence order.
    ///
    /// The default is empty.
    pub gid_maps: Vec<IdRange>,

    /// Whether every translation (and every failed translation) is traced.
    ///
    /// The default value for this option is `false`.
    pub debug: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Config {
    /// Parses uid and gid range specs into a configuration.
    ///
    /// Fails on the first malformed spec.
    pub fn from_specs<U, G>(uid_specs: U, gid_specs: G) -> Result<Self, ConfigError>
    where
        U: IntoIterator,
        U::Item: AsRef<str>,
        G: IntoIterator,
        G::Item: AsRef<str>,
    {
        Ok(Config {
            uid_maps: parse_ranges(uid_specs)?,
            gid_maps: parse_ranges(gid_specs)?,
            debug: false,
        })
    }

    /// Enables or disables translation tracing.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Builds the mapping shared by every decorator of a mount.
    pub fn mapping(&self) -> Arc<IdentityMapping> {
        Arc::new(IdentityMapping::new(
            self.uid_maps.clone(),
            self.gid_maps.clone(),
        ))
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn parse_ranges<I>(specs: I) -> Result<Vec<IdRange>, ConfigError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    specs.into_iter().map(|s| s.as_ref().parse()).collect()
}

fn parse_field(spec: &str, value: &str, field: &'static str) -> Result<u32, ConfigError> {
    value.parse().map_err(|source| ConfigError::BadField {
        spec: spec.to_string(),
        field,
        source,
    })
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl FromStr for IdRange {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = spec.split(':').collect();
        let &[host, container, size] = fields.as_slice() else {
            return Err(ConfigError::BadFormat {
                spec: spec.to_string(),
            });
        };

        IdRange::new(
            parse_field(spec, host, "host id")?,
            parse_field(spec, container, "container id")?,
            parse_field(spec, size, "size")?,
        )
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
