//! The low-level call surface that everything else is built upon.
//!
//! [`Syscalls`] is the capability set: one method per C function the crate needs. It is
//! implemented by [`LibcSyscalls`], which comes in two flavors that behave identically:
//! - [`Backend::Static`] calls the functions the `libc` crate links against at build time;
//! - [`Backend::Dynamic`] resolves the same functions at runtime from the C library already
//!   loaded into the process.
//!
//! The backend is chosen once per process, either explicitly through [`init`] or implicitly on
//! first use through [`provider`], which honors the `IPCSOCKET_BACKEND` environment variable
//! (`static` or `dynamic`). Everything downstream holds a `&'static dyn Syscalls` and never looks
//! at which backend it got.

mod libc_syscalls;
pub use libc_syscalls::*;

use {
    super::unixprelude::*,
    crate::{Error, Result},
    std::{
        env,
        fmt::{self, Debug, Display, Formatter},
        net::Shutdown,
        path::Path,
        str::FromStr,
        sync::OnceLock,
    },
};

/// Name of the environment variable consulted when no backend has been selected explicitly.
pub const BACKEND_ENV_VAR: &str = "IPCSOCKET_BACKEND";

/// The native calls used by sockets and streams.
///
/// Every method either returns a non-negative result or fails with [`Error::Syscall`] carrying
/// the `errno` value of the failed call. Methods that take a path encode it with
/// [`SockaddrUn`](super::SockaddrUn) first and return [`Error::AddressTooLong`] without making
/// any call if it does not fit. All methods block exactly as long as the underlying call does.
pub trait Syscalls: Debug + Send + Sync {
    /// Which backend this is.
    fn backend(&self) -> Backend;

    /// Creates a socket.
    fn socket(&self, domain: c_int, ty: c_int, protocol: c_int) -> Result<RawFd>;
    /// Binds a socket to a path.
    fn bind(&self, fd: RawFd, path: &Path) -> Result<()>;
    /// Marks a bound socket as accepting connections.
    fn listen(&self, fd: RawFd, backlog: c_int) -> Result<()>;
    /// Accepts a connection on a listening socket. `path` seeds the address buffer that the
    /// kernel fills in with the address of the peer, which is then discarded.
    fn accept(&self, fd: RawFd, path: &Path) -> Result<RawFd>;
    /// Connects a socket to the listener at the given path.
    fn connect(&self, fd: RawFd, path: &Path) -> Result<()>;
    /// Reads up to `buf.len()` bytes, returning how many were read. Zero means end-of-stream.
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> Result<usize>;
    /// Writes up to `buf.len()` bytes, returning how many were written.
    fn write(&self, fd: RawFd, buf: &[u8]) -> Result<usize>;
    /// Shuts down one or both directions of a connection.
    fn shutdown(&self, fd: RawFd, how: Shutdown) -> Result<()>;
    /// Closes a descriptor.
    fn close(&self, fd: RawFd) -> Result<()>;
}

/// Selects how native functions are reached.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Backend {
    /// Direct calls to the functions linked in at build time.
    #[default]
    Static,
    /// Calls through function pointers resolved at runtime from the process's C library.
    Dynamic,
}
impl Backend {
    /// Reads the backend from [`BACKEND_ENV_VAR`], returning `None` if it is unset or invalid.
    pub fn from_env() -> Option<Self> {
        let val = env::var(BACKEND_ENV_VAR).ok()?;
        match val.parse() {
            Ok(backend) => Some(backend),
            Err(e) => {
                tracing::warn!("ignoring {BACKEND_ENV_VAR}: {e}");
                None
            }
        }
    }
}
impl Display for Backend {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Static => "static",
            Self::Dynamic => "dynamic",
        })
    }
}

/// Error returned when parsing a [`Backend`] fails.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown syscall backend {0:?}, expected \"static\" or \"dynamic\"")]
pub struct ParseBackendError(String);
impl FromStr for Backend {
    type Err = ParseBackendError;
    fn from_str(s: &str) -> Result<Self, ParseBackendError> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("static") {
            Ok(Self::Static)
        } else if s.eq_ignore_ascii_case("dynamic") {
            Ok(Self::Dynamic)
        } else {
            Err(ParseBackendError(s.to_owned()))
        }
    }
}

static PROVIDER: OnceLock<LibcSyscalls> = OnceLock::new();

/// Selects the backend for the rest of the process's lifetime.
///
/// Calling this again with the same backend is a no-op.
///
/// # Errors
/// - [`Error::BackendConflict`] if a different backend has already been selected, either by an
///   earlier call or implicitly by [`provider`].
/// - [`Error::BackendUnavailable`] if the dynamic backend was requested and could not be set up.
pub fn init(backend: Backend) -> Result<&'static dyn Syscalls> {
    let provider = match PROVIDER.get() {
        Some(p) => p,
        None => {
            let candidate = LibcSyscalls::new(backend)?;
            // Another thread may have won the race, in which case the candidate is dropped
            PROVIDER.get_or_init(move || {
                tracing::debug!(%backend, "selected syscall backend");
                candidate
            })
        }
    };
    if provider.backend() != backend {
        return Err(Error::BackendConflict { selected: provider.backend(), requested: backend });
    }
    Ok(provider)
}

/// Returns the process-wide syscall provider, selecting one if that has not happened yet.
///
/// The implicit selection uses [`BACKEND_ENV_VAR`] if it is set to a valid value and the static
/// backend otherwise.
pub fn provider() -> Result<&'static dyn Syscalls> {
    match PROVIDER.get() {
        Some(p) => Ok(p),
        None => init(Backend::from_env().unwrap_or_default()).or_else(|e| match e {
            // Lost the race to an explicit init(); whatever it chose stands
            Error::BackendConflict { .. } => PROVIDER
                .get()
                .map(|p| p as &'static dyn Syscalls)
                .ok_or(e),
            e => Err(e),
        }),
    }
}

/// Returns the backend that has been selected, if any.
#[inline]
pub fn selected_backend() -> Option<Backend> { PROVIDER.get().map(|p| p.backend()) }
