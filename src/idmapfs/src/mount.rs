//! Scoped mount handle.
//!
//! A [`MountHandle`] owns the decorated root node for the lifetime of a mount. Shutdown is an
//! explicit [`MountHandle::unmount`] call; a process signal handler only needs to call it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filesystem::Node;
use crate::node::MappedNode;
use crate::trace::TraceSink;
use crate::translator::Translator;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// An initialized, id mapped filesystem.
///
/// The hosting filesystem framework dispatches requests to [`MountHandle::root`] from any number
/// of threads. Dropping a handle that is still mounted unmounts it.
pub struct MountHandle<N: Node> {
    root: MappedNode<N>,
    mounted: AtomicBool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<N: Node> MountHandle<N> {
    /// Wraps `root` with the mapping described by `config` and initializes it.
    pub fn new(root: N, config: &Config) -> Result<Self> {
        Self::build(root, config, None)
    }

    /// Like [`MountHandle::new`], sending trace lines and warnings to `sink` instead of `log`.
    pub fn with_sink(root: N, config: &Config, sink: Arc<TraceSink>) -> Result<Self> {
        Self::build(root, config, Some(sink))
    }

    fn build(root: N, config: &Config, sink: Option<Arc<TraceSink>>) -> Result<Self> {
        let mapping = config.mapping();
        if mapping.is_empty() {
            info!("no id ranges configured, ownership will not be translated");
        }

        let mut translator = Translator::new(mapping).debug(config.debug);
        if let Some(sink) = sink {
            translator = translator.with_sink(sink);
        }

        let root = MappedNode::new(root, translator);
        root.init()?;

        debug!(
            "mounted with {} uid and {} gid ranges",
            config.uid_maps.len(),
            config.gid_maps.len()
        );

        Ok(Self {
            root,
            mounted: AtomicBool::new(true),
        })
    }

    /// The decorated root node.
    pub fn root(&self) -> &MappedNode<N> {
        &self.root
    }

    /// Returns true until the first successful [`MountHandle::unmount`].
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Tears the filesystem down.
    ///
    /// Only the first call reaches the wrapped node; later calls return [`Error::NotMounted`].
    pub fn unmount(&self) -> Result<()> {
        if !self.mounted.swap(false, Ordering::AcqRel) {
            return Err(Error::NotMounted);
        }

        self.root.destroy();
        info!("filesystem unmounted");
        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<N: Node> Drop for MountHandle<N> {
    fn drop(&mut self) {
        if self.is_mounted() {
            if let Err(e) = self.unmount() {
                log::error!("error unmounting filesystem on drop: {e}");
            }
        }
    }
}
