use std::io;
use std::time::SystemTime;

use libc::{gid_t, uid_t};

use crate::filesystem::{Attr, File, FileLock};
use crate::translator::Translator;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Wraps an open [`File`] handed out by a mapped node.
///
/// `chown` targets are unmapped to host space (falling back to the requested ids with a warning)
/// and `getattr` results are mapped to container space. Everything else is forwarded unchanged.
pub struct MappedFile {
    inner: Box<dyn File>,
    translator: Translator,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl MappedFile {
    /// Wraps `inner`.
    pub fn new(inner: Box<dyn File>, translator: Translator) -> Self {
        Self { inner, translator }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl File for MappedFile {
    fn read(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        self.inner.read(buf, offset)
    }

    fn write(&self, data: &[u8], offset: u64) -> io::Result<usize> {
        self.inner.write(data, offset)
    }

    fn getlk(&self, owner: u64, lk: &FileLock, flags: u32) -> io::Result<FileLock> {
        self.inner.getlk(owner, lk, flags)
    }

    fn setlk(&self, owner: u64, lk: &FileLock, flags: u32) -> io::Result<()> {
        self.inner.setlk(owner, lk, flags)
    }

    fn setlkw(&self, owner: u64, lk: &FileLock, flags: u32) -> io::Result<()> {
        self.inner.setlkw(owner, lk, flags)
    }

    fn flush(&self) -> io::Result<()> {
        self.inner.flush()
    }

    fn release(&self) {
        self.inner.release()
    }

    fn fsync(&self, datasync: bool) -> io::Result<()> {
        self.inner.fsync(datasync)
    }

    fn truncate(&self, size: u64) -> io::Result<()> {
        self.inner.truncate(size)
    }

    fn getattr(&self) -> io::Result<Attr> {
        let mut attr = self.inner.getattr()?;
        self.translator.map_attr(&mut attr);
        Ok(attr)
    }

    fn chown(&self, uid: uid_t, gid: gid_t) -> io::Result<()> {
        let (uid, gid) = self.translator.host_owner("chown", uid, gid);
        self.inner.chown(uid, gid)
    }

    fn chmod(&self, mode: u32) -> io::Result<()> {
        self.inner.chmod(mode)
    }

    fn utimens(&self, atime: Option<SystemTime>, mtime: Option<SystemTime>) -> io::Result<()> {
        self.inner.utimens(atime, mtime)
    }

    fn allocate(&self, offset: u64, length: u64, mode: u32) -> io::Result<()> {
        self.inner.allocate(offset, length, mode)
    }
}
