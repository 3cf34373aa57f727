use {
    super::{
        path_drop_guard::PathDropGuard,
        syscall::{self, Syscalls},
        unixprelude::*,
        RefCountedFd, UdStream,
    },
    crate::{Error, Result},
    std::{
        fmt::{self, Debug, Formatter},
        iter::FusedIterator,
        path::Path,
    },
};

/// Backlog used by [`UdStreamListener::bind`], the same one the standard library uses for its
/// listeners.
pub const DEFAULT_BACKLOG: c_int = 128;

/// A Unix domain byte stream socket server, listening for connections.
///
/// # Examples
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use ipcsocket::os::unix::{UdStream, UdStreamListener};
/// use std::io::{prelude::*, BufReader};
///
/// fn handle_error(result: ipcsocket::Result<UdStream>) -> Option<UdStream> {
///     match result {
///         Ok(val) => Some(val),
///         Err(error) => {
///             eprintln!("There was an error with an incoming connection: {error}");
///             None
///         }
///     }
/// }
///
/// let listener = UdStreamListener::bind_with_drop_guard("/tmp/example.sock")?;
/// let mut buffer = String::new();
/// for conn in listener.incoming().filter_map(handle_error) {
///     let (recver, sender) = conn.split();
///     BufReader::new(recver).read_line(&mut buffer)?;
///     (&sender).write_all(b"Hello from server!\n")?;
///     print!("Client answered: {buffer}");
///     buffer.clear();
/// }
/// # Ok(()) }
/// ```
pub struct UdStreamListener {
    fd: RefCountedFd,
    // Dropped after the socket is closed
    drop_guard: PathDropGuard,
}
impl UdStreamListener {
    /// Creates a new listener socket at the specified path, with a backlog of
    /// [`DEFAULT_BACKLOG`].
    ///
    /// After the listener is dropped, the socket file is left over. Use
    /// [`bind_with_drop_guard()`](Self::bind_with_drop_guard) to remove it automatically.
    ///
    /// # Errors
    /// - [`Error::AddressTooLong`] if the path does not fit into a socket address.
    /// - [`Error::Syscall`] if any of the calls fails, e.g. with `EADDRINUSE` if the file
    ///   already exists.
    ///
    /// # System calls
    /// - `socket`
    /// - `bind`
    /// - `listen`
    #[inline]
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_backlog(path, DEFAULT_BACKLOG)
    }
    /// Like [`bind()`](Self::bind), but with the given limit on the number of connections that
    /// may wait to be accepted.
    pub fn bind_with_backlog(path: impl AsRef<Path>, backlog: c_int) -> Result<Self> {
        Self::bind_with(syscall::provider()?, path.as_ref(), backlog, false)
    }
    /// Like [`bind()`](Self::bind), but deletes the socket file once the listener is dropped.
    pub fn bind_with_drop_guard(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with(syscall::provider()?, path.as_ref(), DEFAULT_BACKLOG, true)
    }
    pub(crate) fn bind_with(
        syscalls: &'static dyn Syscalls,
        path: &Path,
        backlog: c_int,
        keep_drop_guard: bool,
    ) -> Result<Self> {
        let fd = syscalls.socket(libc::AF_UNIX, libc::SOCK_STREAM, 0)?;
        // SAFETY: we just created this descriptor
        let fd = unsafe { RefCountedFd::new(fd, syscalls) };
        fd.with(|raw| syscalls.bind(raw, path)).transpose()?;
        // The file exists from here on, so a failing listen() already has to clean it up
        let drop_guard = PathDropGuard::new(path.to_owned(), keep_drop_guard);
        fd.with(|raw| syscalls.listen(raw, backlog)).transpose()?;
        tracing::debug!(path = %path.display(), backlog, "listening");
        Ok(Self { fd, drop_guard })
    }

    /// Blocks until a client connects, and returns the stream connected to it.
    ///
    /// Closing the listener from another thread does not wake up a thread blocked here. The
    /// descriptor is closed once `accept` returns, which it will do when the next client
    /// connects.
    ///
    /// # Errors
    /// - [`Error::HandleClosed`] if the listener has been closed.
    /// - [`Error::Syscall`] if `accept` fails.
    ///
    /// # System calls
    /// - `accept`
    pub fn accept(&self) -> Result<UdStream> {
        let fd = &self.fd;
        let syscalls = fd.syscalls();
        let conn = fd
            .with(|raw| syscalls.accept(raw, &self.drop_guard.path))
            .ok_or(Error::HandleClosed)??;
        // SAFETY: the descriptor was just handed to us by accept()
        Ok(UdStream::from(unsafe { RefCountedFd::new(conn, syscalls) }))
    }

    /// Creates an infinite iterator which calls [`accept()`](Self::accept) with each iteration.
    /// Used together with `for` loops to conveniently create a main loop for a socket server.
    #[inline]
    pub fn incoming(&self) -> Incoming<'_> { Incoming::from(self) }

    /// Closes the listener. Connections that have already been accepted are unaffected. Calling
    /// this more than once does nothing.
    ///
    /// # System calls
    /// - `close`, possibly deferred until a pending `accept` returns
    #[inline]
    pub fn close(&self) -> Result<()> { self.fd.close() }

    /// Returns `true` if the listener has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool { self.fd.is_closed() }

    /// Returns the path the listener is bound to.
    #[inline]
    pub fn path(&self) -> &Path { &self.drop_guard.path }
}
impl Debug for UdStreamListener {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdStreamListener")
            .field("fd", &self.fd)
            .field("path", &self.drop_guard.path)
            .field("has_drop_guard", &self.drop_guard.enabled)
            .finish()
    }
}

/// An infinite iterator over incoming client connections of a [`UdStreamListener`].
///
/// This iterator is created by the [`incoming()`](UdStreamListener::incoming) method on
/// [`UdStreamListener`]; see its documentation for more.
#[derive(Debug)]
pub struct Incoming<'a> {
    listener: &'a UdStreamListener,
}
impl Iterator for Incoming<'_> {
    type Item = Result<UdStream>;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> { Some(self.listener.accept()) }
    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) { (usize::MAX, None) }
}
impl FusedIterator for Incoming<'_> {}
impl<'a> From<&'a UdStreamListener> for Incoming<'a> {
    #[inline]
    fn from(listener: &'a UdStreamListener) -> Self { Self { listener } }
}
