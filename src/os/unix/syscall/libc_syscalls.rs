use {
    super::{super::unixprelude::*, Backend, Syscalls},
    crate::{os::unix::SockaddrUn, Error, Result},
    libloading::os::unix::{Library, Symbol},
    std::{
        fmt::{self, Debug, Formatter},
        net::Shutdown,
        path::Path,
    },
};

type SocketFn = unsafe extern "C" fn(c_int, c_int, c_int) -> c_int;
type BindFn = unsafe extern "C" fn(c_int, *const sockaddr, socklen_t) -> c_int;
type ListenFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type AcceptFn = unsafe extern "C" fn(c_int, *mut sockaddr, *mut socklen_t) -> c_int;
type ConnectFn = unsafe extern "C" fn(c_int, *const sockaddr, socklen_t) -> c_int;
type ReadFn = unsafe extern "C" fn(c_int, *mut c_void, size_t) -> ssize_t;
type WriteFn = unsafe extern "C" fn(c_int, *const c_void, size_t) -> ssize_t;
type ShutdownFn = unsafe extern "C" fn(c_int, c_int) -> c_int;
type CloseFn = unsafe extern "C" fn(c_int) -> c_int;

/// Entry points for the C functions, in whichever way they were obtained.
#[derive(Copy, Clone)]
struct CallTable {
    socket: SocketFn,
    bind: BindFn,
    listen: ListenFn,
    accept: AcceptFn,
    connect: ConnectFn,
    read: ReadFn,
    write: WriteFn,
    shutdown: ShutdownFn,
    close: CloseFn,
}

macro_rules! resolve_table {
    ($lib:expr; $($name:ident),+ $(,)?) => {
        CallTable {$(
            // SAFETY: the type of every field matches the C prototype of the function of the same
            // name
            $name: unsafe { resolve($lib, stringify!($name), concat!(stringify!($name), "\0")) }?,
        )+}
    };
}

impl CallTable {
    fn linked() -> Self {
        Self {
            socket: libc::socket,
            bind: libc::bind,
            listen: libc::listen,
            accept: libc::accept,
            connect: libc::connect,
            read: libc::read,
            write: libc::write,
            shutdown: libc::shutdown,
            close: libc::close,
        }
    }
    fn resolve(lib: &Library) -> Result<Self> {
        Ok(resolve_table!(lib; socket, bind, listen, accept, connect, read, write, shutdown, close))
    }
}

/// Looks up a function by name.
///
/// # Safety
/// `T` must be a function pointer type matching the C prototype of the symbol.
unsafe fn resolve<T: Copy>(lib: &Library, name: &'static str, cname: &'static str) -> Result<T> {
    let sym: Symbol<T> = unsafe { lib.get(cname.as_bytes()) }
        .map_err(|e| Error::BackendUnavailable { symbol: name, reason: e.to_string() })?;
    Ok(*sym)
}

/// [`Syscalls`] implementation backed by the system C library.
///
/// Both backends share this type and differ only in how the function pointers in it were
/// obtained, which is what keeps their observable behavior identical.
pub struct LibcSyscalls {
    calls: CallTable,
    backend: Backend,
    // Keeps the resolved symbols valid. The handle refers to the process image itself, so it
    // never actually unloads anything.
    _library: Option<Library>,
}
impl LibcSyscalls {
    /// Creates the backend of the given kind.
    pub fn new(backend: Backend) -> Result<Self> {
        match backend {
            Backend::Static => Ok(Self::linked()),
            Backend::Dynamic => Self::resolve(),
        }
    }
    /// Creates the static backend.
    pub fn linked() -> Self {
        Self { calls: CallTable::linked(), backend: Backend::Static, _library: None }
    }
    /// Creates the dynamic backend by resolving every function from the C library the process
    /// has already loaded.
    ///
    /// # Errors
    /// [`Error::BackendUnavailable`] naming the first function that could not be resolved.
    pub fn resolve() -> Result<Self> {
        let library = Library::this();
        let calls = CallTable::resolve(&library)?;
        Ok(Self { calls, backend: Backend::Dynamic, _library: Some(library) })
    }
}

impl Syscalls for LibcSyscalls {
    #[inline]
    fn backend(&self) -> Backend { self.backend }

    fn socket(&self, domain: c_int, ty: c_int, protocol: c_int) -> Result<RawFd> {
        let fd = unsafe { (self.calls.socket)(domain, ty, protocol) };
        ok_or_errno!("socket", fd != -1 => fd)
    }
    fn bind(&self, fd: RawFd, path: &Path) -> Result<()> {
        let addr = SockaddrUn::from_path(path)?;
        let success = unsafe {
            // SAFETY: addr is nul-terminated and addr_len() matches its size
            (self.calls.bind)(fd, addr.as_ptr(), addr.addr_len()) != -1
        };
        ok_or_errno!("bind", success => ())
    }
    fn listen(&self, fd: RawFd, backlog: c_int) -> Result<()> {
        let success = unsafe { (self.calls.listen)(fd, backlog) != -1 };
        ok_or_errno!("listen", success => ())
    }
    fn accept(&self, fd: RawFd, path: &Path) -> Result<RawFd> {
        let mut addr = SockaddrUn::from_path(path)?;
        let mut addr_len = addr.addr_len();
        let conn = unsafe {
            // SAFETY: the kernel writes at most addr_len bytes into addr
            (self.calls.accept)(fd, addr.as_mut_ptr(), &mut addr_len)
        };
        ok_or_errno!("accept", conn != -1 => conn)
    }
    fn connect(&self, fd: RawFd, path: &Path) -> Result<()> {
        let addr = SockaddrUn::from_path(path)?;
        let success = unsafe {
            // SAFETY: as in bind()
            (self.calls.connect)(fd, addr.as_ptr(), addr.addr_len()) != -1
        };
        ok_or_errno!("connect", success => ())
    }
    #[allow(clippy::as_conversions, clippy::cast_sign_loss)]
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> Result<usize> {
        let bytes_read = unsafe { (self.calls.read)(fd, buf.as_mut_ptr().cast(), buf.len()) };
        ok_or_errno!("read", bytes_read >= 0 => bytes_read as usize)
    }
    #[allow(clippy::as_conversions, clippy::cast_sign_loss)]
    fn write(&self, fd: RawFd, buf: &[u8]) -> Result<usize> {
        let bytes_written = unsafe { (self.calls.write)(fd, buf.as_ptr().cast(), buf.len()) };
        ok_or_errno!("write", bytes_written >= 0 => bytes_written as usize)
    }
    fn shutdown(&self, fd: RawFd, how: Shutdown) -> Result<()> {
        let how = match how {
            Shutdown::Read => libc::SHUT_RD,
            Shutdown::Write => libc::SHUT_WR,
            Shutdown::Both => libc::SHUT_RDWR,
        };
        let success = unsafe { (self.calls.shutdown)(fd, how) != -1 };
        ok_or_errno!("shutdown", success => ())
    }
    fn close(&self, fd: RawFd) -> Result<()> {
        let success = unsafe { (self.calls.close)(fd) != -1 };
        ok_or_errno!("close", success => ())
    }
}

impl Debug for LibcSyscalls {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LibcSyscalls").field("backend", &self.backend).finish_non_exhaustive()
    }
}
