//! The error type shared by every operation in the crate.
//!
//! Native failures are never flattened into a sentinel value: they arrive as
//! [`Error::Syscall`], which names the call that failed and carries the `errno` value it left
//! behind. Conversion into [`io::Error`] keeps the [`ErrorKind`](io::ErrorKind) that the OS code
//! maps to, which is what allows `std::io` adapters such as `read_exact` to retry on
//! [`Interrupted`](io::ErrorKind::Interrupted).

#[cfg(unix)]
use crate::os::unix::syscall::Backend;
use {std::io, thiserror::Error};

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by address encoding, the syscall layer and the streams built on top of it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The socket path does not fit into the path field of the socket address structure.
    #[error(
        "socket path is {len} bytes long, which does not fit into a {capacity}-byte sun_path \
         alongside the nul terminator"
    )]
    AddressTooLong {
        /// Length of the encoded path in bytes.
        len: usize,
        /// Size of the path field, including the byte reserved for the terminator.
        capacity: usize,
    },
    /// A native call reported failure.
    #[error("{operation}() failed: {}", io::Error::from_raw_os_error(*code))]
    Syscall {
        /// Name of the C function that failed.
        operation: &'static str,
        /// The `errno` value left behind by the call.
        code: i32,
    },
    /// A write on a blocking stream transferred fewer bytes than requested.
    #[error("could not write {requested} bytes as requested (wrote {written} bytes instead)")]
    ShortWrite {
        /// Size of the buffer handed to `write`.
        requested: usize,
        /// Byte count reported by `write`.
        written: usize,
    },
    /// The handle was closed before the operation could begin.
    ///
    /// Streams never surface this: reads turn it into end-of-stream and writes into a no-op. It
    /// is returned by listeners, for which there is no neutral outcome.
    #[error("the handle has already been closed")]
    HandleClosed,
    /// The dynamic backend could not resolve one of the C functions it needs.
    #[error("failed to resolve `{symbol}` from the C runtime: {reason}")]
    BackendUnavailable {
        /// Name of the symbol that could not be resolved.
        symbol: &'static str,
        /// Description of the failure as reported by the dynamic loader.
        reason: String,
    },
    /// A different syscall backend has already been selected for this process.
    #[cfg(unix)]
    #[error("the {selected} syscall backend is already in use, cannot switch to the {requested} one")]
    BackendConflict {
        /// The backend that is in use.
        selected: Backend,
        /// The backend that was asked for.
        requested: Backend,
    },
}

impl Error {
    /// Captures `errno` after a failed call to `operation`.
    #[cold]
    pub(crate) fn last_os_error(operation: &'static str) -> Self {
        let code = io::Error::last_os_error().raw_os_error().unwrap_or(0);
        Self::Syscall { operation, code }
    }

    /// Returns the OS error code, if this is a syscall error.
    #[inline]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Syscall { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Classifies the error the way [`io::Error`] would.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::AddressTooLong { .. } => io::ErrorKind::InvalidInput,
            Self::Syscall { code, .. } => io::Error::from_raw_os_error(*code).kind(),
            Self::ShortWrite { .. } => io::ErrorKind::WriteZero,
            Self::HandleClosed => io::ErrorKind::NotConnected,
            Self::BackendUnavailable { .. } => io::ErrorKind::Unsupported,
            #[cfg(unix)]
            Self::BackendConflict { .. } => io::ErrorKind::Other,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self { io::Error::new(e.kind(), e) }
}
