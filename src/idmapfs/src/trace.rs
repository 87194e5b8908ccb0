//! Line oriented diagnostic sink.

use std::fmt;
use std::io::{self, Write};
use std::sync::Mutex;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A shared text sink receiving one human readable line per trace message.
///
/// The sink may be written from any number of request threads at once. Each line is written with
/// a single `write_all` while holding the lock, so lines never interleave. The text is a debugging
/// aid only, not a stable format.
pub struct TraceSink {
    out: Mutex<Box<dyn Write + Send>>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl TraceSink {
    /// Wraps a writer, e.g. `io::stderr()` or an open log file.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    /// Writes `args` followed by a newline.
    ///
    /// Failures are logged and dropped; tracing never fails a filesystem call.
    pub fn line(&self, args: fmt::Arguments<'_>) {
        let mut line = args.to_string();
        line.push('\n');

        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Err(e) = out.write_all(line.as_bytes()).and_then(|_| out.flush()) {
            log::error!("failed to write trace line: {e}");
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl fmt::Debug for TraceSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSink").finish_non_exhaustive()
    }
}

impl Default for TraceSink {
    fn default() -> Self {
        Self::new(io::stderr())
    }
}
