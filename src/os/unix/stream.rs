use {
    super::{
        syscall::{self, Syscalls},
        unixprelude::*,
        RefCountedFd,
    },
    crate::{Error, Result},
    std::{
        io::{self, Read, Write},
        net::Shutdown,
        path::Path,
        sync::Arc,
    },
};

/// A Unix domain socket byte stream, obtained either from
/// [`UdStreamListener`](super::UdStreamListener) or by connecting to an existing server.
///
/// All methods take `&self`, so the stream can be shared between threads (typically one reading,
/// one writing, and possibly a third one closing it). Closing while another thread is blocked in
/// a read or write does not interrupt that call, and the descriptor is only handed back to the OS
/// once the call returns; see [`RefCountedFd`].
///
/// # Closed streams
/// Once the stream has been [closed](Self::close), reads report end-of-stream and writes and
/// shutdowns are silently dropped.
///
/// # Examples
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use ipcsocket::os::unix::UdStream;
/// use std::io::prelude::*;
///
/// let mut conn = UdStream::connect("/tmp/example.sock")?;
/// conn.write_all(b"Hello from client!\n")?;
/// let mut buf = [0; 64];
/// let n = conn.recv(&mut buf)?;
/// println!("Server answered: {}", String::from_utf8_lossy(&buf[..n]));
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct UdStream {
    fd: RefCountedFd,
}
impl UdStream {
    /// Connects to a Unix domain socket server at the specified path.
    ///
    /// # System calls
    /// - `socket`
    /// - `connect`
    pub fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with(syscall::provider()?, path.as_ref())
    }
    pub(crate) fn connect_with(syscalls: &'static dyn Syscalls, path: &Path) -> Result<Self> {
        let fd = syscalls.socket(libc::AF_UNIX, libc::SOCK_STREAM, 0)?;
        // SAFETY: we just created this descriptor. If connect fails, dropping it closes it.
        let fd = unsafe { RefCountedFd::new(fd, syscalls) };
        fd.with(|raw| syscalls.connect(raw, path)).transpose()?;
        Ok(Self::from(fd))
    }

    /// Wraps a descriptor of a connected stream socket obtained elsewhere.
    ///
    /// # Errors
    /// Fails only if no syscall provider can be selected. Ownership of `fd` is taken on success
    /// alone, so on error the descriptor is still the caller's to close.
    ///
    /// # Safety
    /// `fd` must be an open, connected `SOCK_STREAM` socket that nothing else will close.
    pub unsafe fn from_raw_fd(fd: RawFd) -> Result<Self> {
        let syscalls = syscall::provider()?;
        // SAFETY: forwarded to the caller
        Ok(unsafe { Self::from_raw_fd_with(syscalls, fd) })
    }
    /// # Safety
    /// See [`from_raw_fd`](Self::from_raw_fd).
    pub(crate) unsafe fn from_raw_fd_with(syscalls: &'static dyn Syscalls, fd: RawFd) -> Self {
        // SAFETY: forwarded to the caller
        Self::from(unsafe { RefCountedFd::new(fd, syscalls) })
    }

    /// Receives bytes from the socket stream.
    ///
    /// Makes a single `read` call for up to `buf.len()` bytes and returns how many bytes it
    /// delivered, which may well be fewer than requested. `Ok(0)` means end-of-stream: either the
    /// peer has shut down its side, or this stream has been closed. An empty `buf` also yields
    /// `Ok(0)`, without making a call.
    ///
    /// # System calls
    /// - `read`
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let fd = &self.fd;
        fd.with(|raw| fd.syscalls().read(raw, buf)).unwrap_or(Ok(0))
    }

    /// Sends the entire buffer into the socket stream.
    ///
    /// Makes a single `write` call. A blocking stream socket is expected to either take the whole
    /// buffer or block until it can, so a partial write is reported as [`Error::ShortWrite`]
    /// rather than retried. Sending into a closed stream does nothing.
    ///
    /// # System calls
    /// - `write`
    pub fn send(&self, buf: &[u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let fd = &self.fd;
        let Some(written) = fd.with(|raw| fd.syscalls().write(raw, buf)).transpose()? else {
            tracing::trace!("dropping {} byte write to a closed stream", buf.len());
            return Ok(());
        };
        if written != buf.len() {
            return Err(Error::ShortWrite { requested: buf.len(), written });
        }
        Ok(())
    }

    /// Shuts down the read half, the write half, or both halves of the connection.
    ///
    /// The descriptor stays open. Shutting down the read half is the way to wake up a thread that
    /// is blocked reading from this stream. Does nothing if the stream has been closed.
    ///
    /// # System calls
    /// - `shutdown`
    pub fn shutdown(&self, how: Shutdown) -> Result<()> {
        let fd = &self.fd;
        fd.with(|raw| fd.syscalls().shutdown(raw, how)).unwrap_or(Ok(()))
    }

    /// Closes the stream.
    ///
    /// Safe to call from any thread at any time, including while other threads are blocked in
    /// [`recv`](Self::recv) or [`send`](Self::send). Those calls finish on the original descriptor,
    /// which is closed once the last of them returns. Calling this more than once does nothing.
    ///
    /// # System calls
    /// - `close`, possibly deferred
    #[inline]
    pub fn close(&self) -> Result<()> { self.fd.close() }

    /// Returns `true` if the stream has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool { self.fd.is_closed() }

    /// Borrows the reference-counted descriptor.
    #[inline]
    pub fn as_refcounted_fd(&self) -> &RefCountedFd { &self.fd }

    /// Splits the stream into a receive half and a send half that can be moved to different
    /// threads. Both halves keep the stream alive, and closing either one closes the stream.
    pub fn split(self) -> (RecvHalf, SendHalf) {
        let arc = Arc::new(self);
        (RecvHalf(Arc::clone(&arc)), SendHalf(arc))
    }
}

impl From<RefCountedFd> for UdStream {
    #[inline]
    fn from(fd: RefCountedFd) -> Self { Self { fd } }
}

impl Read for &UdStream {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { Ok(self.recv(buf)?) }
}
impl Write for &UdStream {
    /// Writes the whole buffer or fails; see [`UdStream::send`].
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.send(buf)?;
        Ok(buf.len())
    }
    #[inline]
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
multimacro! {
    UdStream,
    derive_sync_mut_rw,
}

/// [`UdStream`]'s receive half, implemented using [`Arc`].
#[derive(Clone, Debug)]
pub struct RecvHalf(Arc<UdStream>);
impl RecvHalf {
    /// See [`UdStream::recv`].
    #[inline]
    pub fn recv(&self, buf: &mut [u8]) -> Result<usize> { self.0.recv(buf) }
    /// Shuts down the read half of the connection; see [`UdStream::shutdown`].
    #[inline]
    pub fn shutdown(&self) -> Result<()> { self.0.shutdown(Shutdown::Read) }
    /// Closes the stream; see [`UdStream::close`].
    #[inline]
    pub fn close(&self) -> Result<()> { self.0.close() }
    /// Borrows the stream within the `Arc`.
    #[inline]
    pub fn as_stream(&self) -> &UdStream { &self.0 }
}
impl Read for &RecvHalf {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> { (&*self.0).read(buf) }
}
multimacro! {
    RecvHalf,
    derive_sync_mut_read,
}

/// [`UdStream`]'s send half, implemented using [`Arc`].
#[derive(Clone, Debug)]
pub struct SendHalf(Arc<UdStream>);
impl SendHalf {
    /// See [`UdStream::send`].
    #[inline]
    pub fn send(&self, buf: &[u8]) -> Result<()> { self.0.send(buf) }
    /// Shuts down the write half of the connection; see [`UdStream::shutdown`].
    #[inline]
    pub fn shutdown(&self) -> Result<()> { self.0.shutdown(Shutdown::Write) }
    /// Closes the stream; see [`UdStream::close`].
    #[inline]
    pub fn close(&self) -> Result<()> { self.0.close() }
    /// Borrows the stream within the `Arc`.
    #[inline]
    pub fn as_stream(&self) -> &UdStream { &self.0 }
}
impl Write for &SendHalf {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> { (&*self.0).write(buf) }
    #[inline]
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}
multimacro! {
    SendHalf,
    derive_sync_mut_write,
}
