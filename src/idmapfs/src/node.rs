//! Id mapping decorator for [`Node`] implementations.

use std::ffi::{CStr, CString};
use std::io;
use std::time::SystemTime;

use libc::{gid_t, uid_t};

use crate::file::MappedFile;
use crate::filesystem::{Attr, Context, DirEntry, Entry, File, FileLock, Inode, Node, StatFs};
use crate::translator::Translator;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Wraps a [`Node`] so that callers see container-space ownership while the wrapped node works in
/// host space.
///
/// - Every request context is unmapped to host space before it is forwarded.
/// - Attributes coming back from `lookup`, `getattr` and the create family are mapped to container
///   space. Inode numbers pass through untouched.
/// - `chown` targets are unmapped to host space when a mapping exists.
/// - Files returned from `open` and `create` are wrapped in a [`MappedFile`].
/// - Errors from the wrapped node are returned as they are.
///
/// Translation follows [`IdentityMapping`](crate::idmap::IdentityMapping): an identity is
/// translated only when both its uid and its gid are covered by a range.
pub struct MappedNode<N> {
    inner: N,
    translator: Translator,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<N: Node> MappedNode<N> {
    /// Wraps `inner`.
    pub fn new(inner: N, translator: Translator) -> Self {
        Self { inner, translator }
    }

    /// The wrapped node.
    pub fn inner(&self) -> &N {
        &self.inner
    }

    fn map_entry(&self, result: io::Result<Entry>) -> io::Result<Entry> {
        result.map(|mut entry| {
            self.translator.map_attr(&mut entry.attr);
            entry
        })
    }

    fn wrap_file(&self, file: Box<dyn File>) -> Box<dyn File> {
        Box::new(MappedFile::new(file, self.translator.clone()))
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<N: Node> Node for MappedNode<N> {
    fn init(&self) -> io::Result<()> {
        self.inner.init()
    }

    fn destroy(&self) {
        self.inner.destroy()
    }

    fn lookup(&self, mut ctx: Context, parent: Inode, name: &CStr) -> io::Result<Entry> {
        self.translator.unmap_context(&mut ctx);
        self.map_entry(self.inner.lookup(ctx, parent, name))
    }

    fn access(&self, mut ctx: Context, inode: Inode, mask: u32) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.access(ctx, inode, mask)
    }

    fn readlink(&self, mut ctx: Context, inode: Inode) -> io::Result<Vec<u8>> {
        self.translator.unmap_context(&mut ctx);
        self.inner.readlink(ctx, inode)
    }

    fn mknod(
        &self,
        mut ctx: Context,
        parent: Inode,
        name: &CStr,
        mode: u32,
        rdev: u32,
    ) -> io::Result<Entry> {
        self.translator.unmap_context(&mut ctx);
        self.map_entry(self.inner.mknod(ctx, parent, name, mode, rdev))
    }

    fn mkdir(&self, mut ctx: Context, parent: Inode, name: &CStr, mode: u32) -> io::Result<Entry> {
        self.translator.unmap_context(&mut ctx);
        self.map_entry(self.inner.mkdir(ctx, parent, name, mode))
    }

    fn unlink(&self, mut ctx: Context, parent: Inode, name: &CStr) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.unlink(ctx, parent, name)
    }

    fn rmdir(&self, mut ctx: Context, parent: Inode, name: &CStr) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.rmdir(ctx, parent, name)
    }

    fn symlink(
        &self,
        mut ctx: Context,
        linkname: &CStr,
        parent: Inode,
        name: &CStr,
    ) -> io::Result<Entry> {
        self.translator.unmap_context(&mut ctx);
        self.map_entry(self.inner.symlink(ctx, linkname, parent, name))
    }

    fn rename(
        &self,
        mut ctx: Context,
        olddir: Inode,
        oldname: &CStr,
        newdir: Inode,
        newname: &CStr,
        flags: u32,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner
            .rename(ctx, olddir, oldname, newdir, newname, flags)
    }

    fn link(
        &self,
        mut ctx: Context,
        inode: Inode,
        newparent: Inode,
        newname: &CStr,
    ) -> io::Result<Entry> {
        self.translator.unmap_context(&mut ctx);
        self.map_entry(self.inner.link(ctx, inode, newparent, newname))
    }

    fn create(
        &self,
        mut ctx: Context,
        parent: Inode,
        name: &CStr,
        flags: u32,
        mode: u32,
    ) -> io::Result<(Entry, Box<dyn File>)> {
        self.translator.unmap_context(&mut ctx);
        let (mut entry, file) = self.inner.create(ctx, parent, name, flags, mode)?;
        self.translator.map_attr(&mut entry.attr);
        Ok((entry, self.wrap_file(file)))
    }

    fn open(&self, mut ctx: Context, inode: Inode, flags: u32) -> io::Result<Box<dyn File>> {
        self.translator.unmap_context(&mut ctx);
        let file = self.inner.open(ctx, inode, flags)?;
        Ok(self.wrap_file(file))
    }

    fn opendir(&self, mut ctx: Context, inode: Inode) -> io::Result<Vec<DirEntry>> {
        self.translator.unmap_context(&mut ctx);
        self.inner.opendir(ctx, inode)
    }

    fn read(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: &dyn File,
        buf: &mut [u8],
        offset: u64,
    ) -> io::Result<usize> {
        self.translator.unmap_context(&mut ctx);
        self.inner.read(ctx, inode, file, buf, offset)
    }

    fn write(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: &dyn File,
        data: &[u8],
        offset: u64,
    ) -> io::Result<usize> {
        self.translator.unmap_context(&mut ctx);
        self.inner.write(ctx, inode, file, data, offset)
    }

    fn getxattr(&self, mut ctx: Context, inode: Inode, name: &CStr) -> io::Result<Vec<u8>> {
        self.translator.unmap_context(&mut ctx);
        self.inner.getxattr(ctx, inode, name)
    }

    fn setxattr(
        &self,
        mut ctx: Context,
        inode: Inode,
        name: &CStr,
        value: &[u8],
        flags: u32,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.setxattr(ctx, inode, name, value, flags)
    }

    fn removexattr(&self, mut ctx: Context, inode: Inode, name: &CStr) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.removexattr(ctx, inode, name)
    }

    fn listxattr(&self, mut ctx: Context, inode: Inode) -> io::Result<Vec<CString>> {
        self.translator.unmap_context(&mut ctx);
        self.inner.listxattr(ctx, inode)
    }

    // Lock owners are opaque tokens chosen by the kernel, not uids.
    #[allow(clippy::too_many_arguments)]
    fn getlk(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: &dyn File,
        owner: u64,
        lk: &FileLock,
        flags: u32,
    ) -> io::Result<FileLock> {
        self.translator.unmap_context(&mut ctx);
        self.inner.getlk(ctx, inode, file, owner, lk, flags)
    }

    #[allow(clippy::too_many_arguments)]
    fn setlk(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: &dyn File,
        owner: u64,
        lk: &FileLock,
        flags: u32,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.setlk(ctx, inode, file, owner, lk, flags)
    }

    #[allow(clippy::too_many_arguments)]
    fn setlkw(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: &dyn File,
        owner: u64,
        lk: &FileLock,
        flags: u32,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.setlkw(ctx, inode, file, owner, lk, flags)
    }

    fn getattr(&self, mut ctx: Context, inode: Inode, file: Option<&dyn File>) -> io::Result<Attr> {
        self.translator.unmap_context(&mut ctx);
        let mut attr = self.inner.getattr(ctx, inode, file)?;
        self.translator.map_attr(&mut attr);
        Ok(attr)
    }

    fn chmod(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        mode: u32,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.chmod(ctx, inode, file, mode)
    }

    fn chown(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        uid: uid_t,
        gid: gid_t,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        let (uid, gid) = self.translator.host_owner("chown", uid, gid);
        self.inner.chown(ctx, inode, file, uid, gid)
    }

    fn truncate(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        size: u64,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.truncate(ctx, inode, file, size)
    }

    fn utimens(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner.utimens(ctx, inode, file, atime, mtime)
    }

    fn fallocate(
        &self,
        mut ctx: Context,
        inode: Inode,
        file: Option<&dyn File>,
        offset: u64,
        length: u64,
        mode: u32,
    ) -> io::Result<()> {
        self.translator.unmap_context(&mut ctx);
        self.inner
            .fallocate(ctx, inode, file, offset, length, mode)
    }

    fn statfs(&self, inode: Inode) -> io::Result<StatFs> {
        self.inner.statfs(inode)
    }
}
