//! Applies an [`IdentityMapping`] to attributes and request contexts.
//!
//! Translation failures are never errors at this level. An id without a covering range is left
//! as it is, so a caller outside every configured range sees untranslated ownership instead of a
//! failed filesystem call.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use libc::{gid_t, uid_t};
use log::{log, Level};

use crate::filesystem::{Attr, Context};
use crate::idmap::{Identity, IdentityMapping};
use crate::trace::TraceSink;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Façade over a shared [`IdentityMapping`] with optional tracing.
///
/// Cloning is cheap: the mapping and the sink are shared, never copied.
#[derive(Debug, Clone)]
pub struct Translator {
    mapping: Arc<IdentityMapping>,
    sink: Option<Arc<TraceSink>>,
    debug: bool,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Translator {
    /// Creates a translator without tracing.
    pub fn new(mapping: Arc<IdentityMapping>) -> Self {
        Self {
            mapping,
            sink: None,
            debug: false,
        }
    }

    /// Sends trace lines and warnings to `sink` instead of the `log` facade.
    pub fn with_sink(mut self, sink: Arc<TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Enables tracing of every translation.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Rewrites a host-space attribute owner into container space.
    ///
    /// Leaves the owner untouched if there is no mapping for it.
    pub fn map_attr(&self, attr: &mut Attr) {
        let owner = attr.owner();
        match self.mapping.to_container(owner) {
            Ok(id) => {
                self.trace(format_args!(
                    "mapping host attr owner {owner} to container {id}"
                ));
                attr.set_owner(id);
            }
            Err(_) => self.trace(format_args!("no mapping for host attr owner {owner}")),
        }
    }

    /// Rewrites a container-space attribute owner into host space.
    ///
    /// Leaves the owner untouched if there is no mapping for it.
    pub fn unmap_attr(&self, attr: &mut Attr) {
        let owner = attr.owner();
        match self.mapping.to_host(owner) {
            Ok(id) => {
                self.trace(format_args!(
                    "mapping container attr owner {owner} to host {id}"
                ));
                attr.set_owner(id);
            }
            Err(_) => self.trace(format_args!("no mapping for container attr owner {owner}")),
        }
    }

    /// Rewrites the caller identity of a request into host space.
    ///
    /// Leaves the identity untouched if there is no mapping for it. Traces name the source
    /// location of the caller, i.e. the decorated operation that received the request.
    #[track_caller]
    pub fn unmap_context(&self, ctx: &mut Context) {
        let caller = Location::caller();
        let owner = ctx.owner();
        match self.mapping.to_host(owner) {
            Ok(id) => {
                self.trace(format_args!(
                    "mapping user context {owner} to host context {id}, caller: {}:{}",
                    caller.file(),
                    caller.line()
                ));
                ctx.set_owner(id);
            }
            Err(_) => self.trace(format_args!(
                "no mapping for user context {owner}, caller: {}:{}",
                caller.file(),
                caller.line()
            )),
        }
    }

    /// Resolves the host owner for an ownership change requested in container space.
    ///
    /// Without a mapping the requested pair is returned unchanged and a warning is emitted, so the
    /// change is still applied, just untranslated.
    pub fn host_owner(&self, op: &str, uid: uid_t, gid: gid_t) -> (uid_t, gid_t) {
        match self.mapping.to_host(Identity::new(uid, gid)) {
            Ok(id) => (id.uid, id.gid),
            Err(e) => {
                self.warn(format_args!(
                    "{op}: no mapping for {uid}:{gid} ({e}), keeping original uid:gid"
                ));
                (uid, gid)
            }
        }
    }

    fn trace(&self, args: fmt::Arguments<'_>) {
        if self.debug {
            self.emit(Level::Debug, args);
        }
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    /// Each message goes to exactly one place: the sink if configured, the `log` facade otherwise.
    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        match &self.sink {
            Some(sink) => sink.line(args),
            None => log!(level, "{args}"),
        }
    }
}
