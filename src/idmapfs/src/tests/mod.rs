




//--------------------------------------------------------------------------------------------------
// Modules: Helper
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod helper {
    use std::{
        cell::RefCell,
        ffi::{CStr, CString},
        io::{self, Write},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex, Once,
        },
        time::{Duration, SystemTime},
    };

    use libc::{gid_t, uid_t};
    use log::{Level, LevelFilter, Log, Metadata, Record};

    use crate::{
        config::Config,
        filesystem::{Attr, Context, DirEntry, Entry, File, FileLock, Inode, Node, StatFs},
        idmap::Identity,
        trace::TraceSink,
        translator::Translator,
    };

    //----------------------------------------------------------------------------------------------
    // Types
    //----------------------------------------------------------------------------------------------

    /// One call observed by the recording backend.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(super) struct Call {
        pub(super) op: &'static str,
        pub(super) ctx: Option<Context>,
        pub(super) chown: Option<(uid_t, gid_t)>,
    }

    pub(super) type Calls = Arc<Mutex<Vec<Call>>>;

    /// A writer whose contents can be inspected after being handed to a [`TraceSink`].
    #[derive(Clone, Default)]
    pub(super) struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    /// Backend node that records every call and reports `owner` on every attribute it returns.
    pub(super) struct RecordingNode {
        pub(super) calls: Calls,
        pub(super) owner: Identity,
        pub(super) fail_with: Option<i32>,
        pub(super) destroyed: Arc<AtomicUsize>,
    }

    /// Backend file sharing its call log with the node that opened it.
    pub(super) struct RecordingFile {
        calls: Calls,
        owner: Identity,
    }

    /// Test logger: forwards to `env_logger` and keeps what each thread logged.
    struct CaptureLogger {
        inner: env_logger::Logger,
    }

    thread_local! {
        static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
    }

    //----------------------------------------------------------------------------------------------
    // Constants
    //----------------------------------------------------------------------------------------------

    /// Inode numbers handed out by the recording backend.
    pub(super) const CHILD_INODE: Inode = 42;

    //----------------------------------------------------------------------------------------------
    // Functions
    //----------------------------------------------------------------------------------------------

    pub(super) fn init_logger() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let inner = env_logger::Builder::from_default_env().is_test(true).build();
            let logger: &'static CaptureLogger = Box::leak(Box::new(CaptureLogger { inner }));
            if log::set_logger(logger).is_ok() {
                log::set_max_level(LevelFilter::Trace);
            }
        });
    }

    /// Drains the messages logged on the current thread and returns those at `level`.
    pub(super) fn take_logged(level: Level) -> Vec<String> {
        CAPTURED.with(|c| {
            c.borrow_mut()
                .drain(..)
                .filter(|(l, _)| *l == level)
                .map(|(_, msg)| msg)
                .collect()
        })
    }

    /// uid and gid: container `0` is host `1000`, container `1..=1000` is host `100001..=101000`.
    pub(super) fn config() -> Config {
        Config::from_specs(["1000:0:1", "100001:1:1000"], ["1000:0:1", "100001:1:1000"])
            .expect("valid test config")
    }

    pub(super) fn translator(debug: bool) -> (Translator, SharedBuf) {
        init_logger();
        let buf = SharedBuf::default();
        let translator = Translator::new(config().mapping())
            .with_sink(Arc::new(TraceSink::new(buf.clone())))
            .debug(debug);
        (translator, buf)
    }

    pub(super) fn ctx(uid: uid_t, gid: gid_t) -> Context {
        Context { uid, gid, pid: 1234 }
    }

    pub(super) fn attr(owner: Identity) -> Attr {
        Attr {
            ino: CHILD_INODE,
            mode: libc::S_IFREG | 0o644,
            nlink: 1,
            uid: owner.uid,
            gid: owner.gid,
            ..Default::default()
        }
    }

    pub(super) fn name(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    //----------------------------------------------------------------------------------------------
    // Methods
    //----------------------------------------------------------------------------------------------

    impl SharedBuf {
        pub(super) fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl RecordingNode {
        pub(super) fn new(owner: Identity) -> Self {
            Self {
                calls: Arc::default(),
                owner,
                fail_with: None,
                destroyed: Arc::default(),
            }
        }

        pub(super) fn failing(owner: Identity, errno: i32) -> Self {
            Self {
                fail_with: Some(errno),
                ..Self::new(owner)
            }
        }

        fn record(&self, op: &'static str, ctx: Context) -> io::Result<()> {
            self.calls.lock().unwrap().push(Call {
                op,
                ctx: Some(ctx),
                chown: None,
            });

            match self.fail_with {
                Some(errno) => Err(io::Error::from_raw_os_error(errno)),
                None => Ok(()),
            }
        }

        fn entry(&self) -> Entry {
            Entry {
                inode: CHILD_INODE,
                generation: 7,
                attr: attr(self.owner),
                attr_timeout: Duration::from_secs(5),
                entry_timeout: Duration::from_secs(5),
            }
        }

        fn file(&self) -> Box<dyn File> {
            Box::new(RecordingFile {
                calls: self.calls.clone(),
                owner: self.owner,
            })
        }
    }

    impl RecordingFile {
        fn record(&self, op: &'static str, chown: Option<(uid_t, gid_t)>) {
            self.calls
                .lock()
                .unwrap()
                .push(Call { op, ctx: None, chown });
        }
    }

    //----------------------------------------------------------------------------------------------
    // Trait Implementations
    //----------------------------------------------------------------------------------------------

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Node for RecordingNode {
        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }

        fn lookup(&self, ctx: Context, _parent: Inode, _name: &CStr) -> io::Result<Entry> {
            self.record("lookup", ctx)?;
            Ok(self.entry())
        }

        fn access(&self, ctx: Context, _inode: Inode, _mask: u32) -> io::Result<()> {
            self.record("access", ctx)
        }

        fn readlink(&self, ctx: Context, _inode: Inode) -> io::Result<Vec<u8>> {
            self.record("readlink", ctx)?;
            Ok(b"target".to_vec())
        }

        fn mknod(
            &self,
            ctx: Context,
            _parent: Inode,
            _name: &CStr,
            _mode: u32,
            _rdev: u32,
        ) -> io::Result<Entry> {
            self.record("mknod", ctx)?;
            Ok(self.entry())
        }

        fn mkdir(&self, ctx: Context, _parent: Inode, _name: &CStr, _mode: u32) -> io::Result<Entry> {
            self.record("mkdir", ctx)?;
            Ok(self.entry())
        }

        fn unlink(&self, ctx: Context, _parent: Inode, _name: &CStr) -> io::Result<()> {
            self.record("unlink", ctx)
        }

        fn rmdir(&self, ctx: Context, _parent: Inode, _name: &CStr) -> io::Result<()> {
            self.record("rmdir", ctx)
        }

        fn symlink(
            &self,
            ctx: Context,
            _linkname: &CStr,
            _parent: Inode,
            _name: &CStr,
        ) -> io::Result<Entry> {
            self.record("symlink", ctx)?;
            Ok(self.entry())
        }

        fn rename(
            &self,
            ctx: Context,
            _olddir: Inode,
            _oldname: &CStr,
            _newdir: Inode,
            _newname: &CStr,
            _flags: u32,
        ) -> io::Result<()> {
            self.record("rename", ctx)
        }

        fn link(
            &self,
            ctx: Context,
            _inode: Inode,
            _newparent: Inode,
            _newname: &CStr,
        ) -> io::Result<Entry> {
            self.record("link", ctx)?;
            Ok(self.entry())
        }

        fn create(
            &self,
            ctx: Context,
            _parent: Inode,
            _name: &CStr,
            _flags: u32,
            _mode: u32,
        ) -> io::Result<(Entry, Box<dyn File>)> {
            self.record("create", ctx)?;
            Ok((self.entry(), self.file()))
        }

        fn open(&self, ctx: Context, _inode: Inode, _flags: u32) -> io::Result<Box<dyn File>> {
            self.record("open", ctx)?;
            Ok(self.file())
        }

        fn opendir(&self, ctx: Context, _inode: Inode) -> io::Result<Vec<DirEntry>> {
            self.record("opendir", ctx)?;
            Ok(vec![DirEntry {
                ino: CHILD_INODE,
                offset: 1,
                type_: libc::DT_REG as u32,
                name: name("file1"),
            }])
        }

        fn read(
            &self,
            ctx: Context,
            _inode: Inode,
            file: &dyn File,
            buf: &mut [u8],
            offset: u64,
        ) -> io::Result<usize> {
            self.record("read", ctx)?;
            file.read(buf, offset)
        }

        fn write(
            &self,
            ctx: Context,
            _inode: Inode,
            file: &dyn File,
            data: &[u8],
            offset: u64,
        ) -> io::Result<usize> {
            self.record("write", ctx)?;
            file.write(data, offset)
        }

        fn getxattr(&self, ctx: Context, _inode: Inode, _name: &CStr) -> io::Result<Vec<u8>> {
            self.record("getxattr", ctx)?;
            Ok(b"value".to_vec())
        }

        fn setxattr(
            &self,
            ctx: Context,
            _inode: Inode,
            _name: &CStr,
            _value: &[u8],
            _flags: u32,
        ) -> io::Result<()> {
            self.record("setxattr", ctx)
        }

        fn removexattr(&self, ctx: Context, _inode: Inode, _name: &CStr) -> io::Result<()> {
            self.record("removexattr", ctx)
        }

        fn listxattr(&self, ctx: Context, _inode: Inode) -> io::Result<Vec<CString>> {
            self.record("listxattr", ctx)?;
            Ok(vec![name("user.key")])
        }

        fn getlk(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: &dyn File,
            _owner: u64,
            lk: &FileLock,
            _flags: u32,
        ) -> io::Result<FileLock> {
            self.record("getlk", ctx)?;
            Ok(*lk)
        }

        fn setlk(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: &dyn File,
            _owner: u64,
            _lk: &FileLock,
            _flags: u32,
        ) -> io::Result<()> {
            self.record("setlk", ctx)
        }

        fn setlkw(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: &dyn File,
            _owner: u64,
            _lk: &FileLock,
            _flags: u32,
        ) -> io::Result<()> {
            self.record("setlkw", ctx)
        }

        fn getattr(&self, ctx: Context, _inode: Inode, _file: Option<&dyn File>) -> io::Result<Attr> {
            self.record("getattr", ctx)?;
            Ok(attr(self.owner))
        }

        fn chmod(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: Option<&dyn File>,
            _mode: u32,
        ) -> io::Result<()> {
            self.record("chmod", ctx)
        }

        fn chown(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: Option<&dyn File>,
            uid: uid_t,
            gid: gid_t,
        ) -> io::Result<()> {
            self.calls.lock().unwrap().push(Call {
                op: "chown",
                ctx: Some(ctx),
                chown: Some((uid, gid)),
            });

            match self.fail_with {
                Some(errno) => Err(io::Error::from_raw_os_error(errno)),
                None => Ok(()),
            }
        }

        fn truncate(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: Option<&dyn File>,
            _size: u64,
        ) -> io::Result<()> {
            self.record("truncate", ctx)
        }

        fn utimens(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: Option<&dyn File>,
            _atime: Option<SystemTime>,
            _mtime: Option<SystemTime>,
        ) -> io::Result<()> {
            self.record("utimens", ctx)
        }

        fn fallocate(
            &self,
            ctx: Context,
            _inode: Inode,
            _file: Option<&dyn File>,
            _offset: u64,
            _length: u64,
            _mode: u32,
        ) -> io::Result<()> {
            self.record("fallocate", ctx)
        }

        fn statfs(&self, _inode: Inode) -> io::Result<StatFs> {
            self.calls.lock().unwrap().push(Call {
                op: "statfs",
                ctx: None,
                chown: None,
            });

            Ok(StatFs {
                blocks: 1024,
                bfree: 512,
                bavail: 512,
                files: 100,
                ffree: 50,
                bsize: 4096,
                namelen: 255,
                frsize: 4096,
            })
        }
    }

    impl File for RecordingFile {
        fn read(&self, buf: &mut [u8], _offset: u64) -> io::Result<usize> {
            self.record("file.read", None);
            let data = b"content";
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            Ok(n)
        }

        fn write(&self, data: &[u8], _offset: u64) -> io::Result<usize> {
            self.record("file.write", None);
            Ok(data.len())
        }

        fn setlk(&self, _owner: u64, _lk: &FileLock, _flags: u32) -> io::Result<()> {
            self.record("file.setlk", None);
            Ok(())
        }

        fn flush(&self) -> io::Result<()> {
            self.record("file.flush", None);
            Ok(())
        }

        fn release(&self) {
            self.record("file.release", None);
        }

        fn truncate(&self, _size: u64) -> io::Result<()> {
            self.record("file.truncate", None);
            Ok(())
        }

        fn getattr(&self) -> io::Result<Attr> {
            self.record("file.getattr", None);
            Ok(attr(self.owner))
        }

        fn chown(&self, uid: uid_t, gid: gid_t) -> io::Result<()> {
            self.record("file.chown", Some((uid, gid)));
            Ok(())
        }

        fn utimens(&self, _atime: Option<SystemTime>, _mtime: Option<SystemTime>) -> io::Result<()> {
            self.record("file.utimens", None);
            Ok(())
        }

        fn allocate(&self, _offset: u64, _length: u64, _mode: u32) -> io::Result<()> {
            self.record("file.allocate", None);
            Ok(())
        }
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            CAPTURED.with(|c| c.borrow_mut().push((record.level(), record.args().to_string())));
            if self.inner.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }

        fn flush(&self) {
            self.inner.flush();
        }
    }
}
