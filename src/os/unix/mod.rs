//! Unix domain socket byte streams.
//!
//! The pieces, from the bottom up:
//! - [`SockaddrUn`] encodes a filesystem path into the platform's `sockaddr_un` layout;
//! - [`syscall`] presents `socket`, `bind`, `listen`, `accept`, `connect`, `read`, `write`,
//!   `shutdown` and `close` behind the [`Syscalls`](syscall::Syscalls) trait, implemented by a
//!   statically linked and a dynamically resolved backend;
//! - [`RefCountedFd`] owns a descriptor and makes sure it is never closed while an operation is
//!   still using it, even if [`close`](RefCountedFd::close) is called from another thread;
//! - [`UdStream`] and [`UdStreamListener`] put those together into blocking streams.
//!
//! ## Why the reference counting
//! Descriptor numbers are recycled eagerly: once `close` returns, the very next `open`, `socket`
//! or `accept` anywhere in the process may hand out the same number. A thread that looked up the
//! number before the close and calls `read` after it would then be reading from an unrelated file.
//! Every operation on a [`RefCountedFd`] is therefore bracketed by an acquire and a release, and
//! the actual `close` is deferred until the last bracket ends.

mod listener;
mod path_drop_guard;
mod refcounted_fd;
mod sockaddr;
mod stream;
pub mod syscall;

pub use {listener::*, refcounted_fd::*, sockaddr::*, stream::*};

pub(crate) mod unixprelude {
    #[allow(unused_imports)]
    pub use {
        libc::{c_int, c_void, size_t, sockaddr, socklen_t, ssize_t},
        std::os::unix::{ffi::OsStrExt, io::RawFd},
    };
}
