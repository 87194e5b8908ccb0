//! The node and file capability surface that the id mapping decorators wrap.
//!
//! Both traits are object-safe and every method has a default implementation returning `ENOSYS`,
//! so backends only need to implement the operations they support. Entries are addressed by inode
//! number; open files are handed out as `Box<dyn File>`.

use std::ffi::{CStr, CString};
use std::io;
use std::time::{Duration, SystemTime};

use libc::{gid_t, pid_t, uid_t};

use crate::idmap::Identity;

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

/// Inode number of the root directory.
pub const ROOT_ID: Inode = 1;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Inode number.
pub type Inode = u64;

/// The identity of the process issuing a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    /// The user id of the calling process.
    pub uid: uid_t,

    /// The group id of the calling process.
    pub gid: gid_t,

    /// The thread group id of the calling process.
    pub pid: pid_t,
}

/// Attributes of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr {
    pub ino: Inode,
    pub size: u64,
    pub blocks: u64,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
    pub mode: u32,
    pub nlink: u32,
    pub uid: uid_t,
    pub gid: gid_t,
    pub rdev: u32,
    pub blksize: u32,
}

/// A directory entry along with its attributes, as returned by lookup and the create family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// Inode of the entry. Opaque to the id mapping layer.
    pub inode: Inode,

    /// Inode generation number.
    pub generation: u64,

    /// Attributes of the entry.
    pub attr: Attr,

    /// How long the attributes may be cached.
    pub attr_timeout: Duration,

    /// How long the name lookup may be cached.
    pub entry_timeout: Duration,
}

/// A single directory listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: Inode,
    pub offset: u64,
    pub type_: u32,
    pub name: CString,
}

/// A POSIX byte-range lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileLock {
    pub start: u64,
    pub end: u64,
    pub typ: u32,
    pub pid: u32,
}

/// Filesystem-wide statistics. Carries no per-entry ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub bsize: u32,
    pub namelen: u32,
    pub frsize: u32,
}

/// An open file.
#[allow(unused_variables)]
pub trait File: Send + Sync {
    /// Read data at `offset` into `buf`.
    fn read(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Write `data` at `offset`.
    fn write(&self, data: &[u8], offset: u64) -> io::Result<usize> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Test for a byte-range lock.
    fn getlk(&self, owner: u64, lk: &FileLock, flags: u32) -> io::Result<FileLock> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Acquire or release a byte-range lock.
    fn setlk(&self, owner: u64, lk: &FileLock, flags: u32) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Acquire a byte-range lock, waiting for it.
    fn setlkw(&self, owner: u64, lk: &FileLock, flags: u32) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Called on every close of a file descriptor referring to this file.
    fn flush(&self) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Called once the last reference to the file is gone.
    fn release(&self) {}

    /// Synchronize file contents.
    fn fsync(&self, datasync: bool) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Truncate or extend the file.
    fn truncate(&self, size: u64) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Get the attributes of the file.
    fn getattr(&self) -> io::Result<Attr> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Change the owner of the file.
    fn chown(&self, uid: uid_t, gid: gid_t) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Change the permission bits of the file.
    fn chmod(&self, mode: u32) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Update access and modification times. `None` leaves a timestamp untouched.
    fn utimens(&self, atime: Option<SystemTime>, mtime: Option<SystemTime>) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Pre-allocate space for file data.
    fn allocate(&self, offset: u64, length: u64, mode: u32) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }
}

/// The node-level operations of a mounted filesystem.
#[allow(unused_variables)]
pub trait Node: Send + Sync {
    /// Called once when the filesystem is mounted.
    fn init(&self) -> io::Result<()> {
        Ok(())
    }

    /// Called once when the filesystem is unmounted.
    fn destroy(&self) {}

    /// Look up a directory entry by name and get its attributes.
    fn lookup(&self, ctx: Context, parent: Inode, name: &CStr) -> io::Result<Entry> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Check file access permissions.
    fn access(&self, ctx: Context, inode: Inode, mask: u32) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Read a symbolic link.
    fn readlink(&self, ctx: Context, inode: Inode) -> io::Result<Vec<u8>> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Create a file node.
    fn mknod(
        &self,
        ctx: Context,
        parent: Inode,
        name: &CStr,
        mode: u32,
        rdev: u32,
    ) -> io::Result<Entry> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Create a directory.
    fn mkdir(&self, ctx: Context, parent: Inode, name: &CStr, mode: u32) -> io::Result<Entry> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Remove a file.
    fn unlink(&self, ctx: Context, parent: Inode, name: &CStr) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Remove a directory.
    fn rmdir(&self, ctx: Context, parent: Inode, name: &CStr) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Create a symbolic link named `name` in `parent` pointing at `linkname`.
    fn symlink(
        &self,
        ctx: Context,
        linkname: &CStr,
        parent: Inode,
        name: &CStr,
    ) -> io::Result<Entry> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Rename a file / directory.
    fn rename(
        &self,
        ctx: Context,
        olddir: Inode,
        oldname: &CStr,
        newdir: Inode,
        newname: &CStr,
        flags: u32,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Create a hard link.
    fn link(
        &self,
        ctx: Context,
        inode: Inode,
        newparent: Inode,
        newname: &CStr,
    ) -> io::Result<Entry> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Create and open a file.
    fn create(
        &self,
        ctx: Context,
        parent: Inode,
        name: &CStr,
        flags: u32,
        mode: u32,
    ) -> io::Result<(Entry, Box<dyn File>)> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Open a file.
    fn open(&self, ctx: Context, inode: Inode, flags: u32) -> io::Result<Box<dyn File>> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Open a directory and list its entries.
    fn opendir(&self, ctx: Context, inode: Inode) -> io::Result<Vec<DirEntry>> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Read data from an open file.
    fn read(
        &self,
        ctx: Context,
        inode: Inode,
        file: &dyn File,
        buf: &mut [u8],
        offset: u64,
    ) -> io::Result<usize> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Write data to an open file.
    fn write(
        &self,
        ctx: Context,
        inode: Inode,
        file: &dyn File,
        data: &[u8],
        offset: u64,
    ) -> io::Result<usize> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Get an extended attribute.
    fn getxattr(&self, ctx: Context, inode: Inode, name: &CStr) -> io::Result<Vec<u8>> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Set an extended attribute.
    fn setxattr(
        &self,
        ctx: Context,
        inode: Inode,
        name: &CStr,
        value: &[u8],
        flags: u32,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Remove an extended attribute.
    fn removexattr(&self, ctx: Context, inode: Inode, name: &CStr) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// List extended attribute names.
    fn listxattr(&self, ctx: Context, inode: Inode) -> io::Result<Vec<CString>> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Test for a byte-range lock.
    #[allow(clippy::too_many_arguments)]
    fn getlk(
        &self,
        ctx: Context,
        inode: Inode,
        file: &dyn File,
        owner: u64,
        lk: &FileLock,
        flags: u32,
    ) -> io::Result<FileLock> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Acquire or release a byte-range lock.
    #[allow(clippy::too_many_arguments)]
    fn setlk(
        &self,
        ctx: Context,
        inode: Inode,
        file: &dyn File,
        owner: u64,
        lk: &FileLock,
        flags: u32,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Acquire a byte-range lock, waiting for it.
    #[allow(clippy::too_many_arguments)]
    fn setlkw(
        &self,
        ctx: Context,
        inode: Inode,
        file: &dyn File,
        owner: u64,
        lk: &FileLock,
        flags: u32,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Get attributes for a file / directory.
    fn getattr(&self, ctx: Context, inode: Inode, file: Option<&dyn File>) -> io::Result<Attr> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Change the permission bits.
    fn chmod(
        &self,
        ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        mode: u32,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Change the owner.
    fn chown(
        &self,
        ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        uid: uid_t,
        gid: gid_t,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Truncate or extend.
    fn truncate(
        &self,
        ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        size: u64,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Update access and modification times. `None` leaves a timestamp untouched.
    fn utimens(
        &self,
        ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Allocate requested space for file data.
    fn fallocate(
        &self,
        ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        offset: u64,
        length: u64,
        mode: u32,
    ) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    /// Get information about the file system.
    fn statfs(&self, inode: Inode) -> io::Result<StatFs> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl Context {
    /// The caller's `(uid, gid)`.
    pub fn owner(&self) -> Identity {
        Identity::new(self.uid, self.gid)
    }

    /// Replaces the caller's `(uid, gid)`, keeping the pid.
    pub fn set_owner(&mut self, id: Identity) {
        self.uid = id.uid;
        self.gid = id.gid;
    }
}

impl Attr {
    /// The owner of the entry.
    pub fn owner(&self) -> Identity {
        Identity::new(self.uid, self.gid)
    }

    /// Replaces the owner of the entry.
    pub fn set_owner(&mut self, id: Identity) {
        self.uid = id.uid;
        self.gid = id.gid;
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for Attr {
    fn default() -> Self {
        Attr {
            ino: 0,
            size: 0,
            blocks: 0,
            atime: SystemTime::UNIX_EPOCH,
            mtime: SystemTime::UNIX_EPOCH,
            ctime: SystemTime::UNIX_EPOCH,
            mode: 0,
            nlink: 0,
            uid: 0,
            gid: 0,
            rdev: 0,
            blksize: 0,
        }
    }
}
