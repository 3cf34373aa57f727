use {
    super::{syscall::Syscalls, unixprelude::*},
    crate::Result,
    std::{
        fmt::{self, Debug, Formatter},
        ops::Deref,
        os::fd::{AsFd, AsRawFd, BorrowedFd},
        sync::atomic::{
            AtomicUsize,
            Ordering::{AcqRel, Acquire, Relaxed},
        },
    },
};

// The count of in-flight operations and the closed flag share a single word so that "is it still
// open" and "I am about to use it" are decided by one atomic operation.
const CLOSED: usize = 1;
const ONE_OP: usize = 2;

/// A file descriptor shared between concurrent operations and an explicit close.
///
/// Any use of the descriptor has to be bracketed by [`acquire`](Self::acquire), which hands out
/// an [`FdGuard`], and the drop of that guard. [`close`](Self::close) never waits for those
/// brackets: it marks the descriptor as closed, so that no new operation can begin, and leaves
/// the `close` call itself to whichever of the outstanding guards is dropped last. As a result,
/// an operation that has been admitted always runs against the descriptor it was admitted for,
/// never against an unrelated one that the OS handed out under the same number after a close.
///
/// The descriptor is closed exactly once: by `close()` if nothing is in flight, by the last guard
/// otherwise, or by `Drop` if `close()` was never called.
pub struct RefCountedFd {
    fd: RawFd,
    state: AtomicUsize,
    syscalls: &'static dyn Syscalls,
}
impl RefCountedFd {
    /// Takes ownership of `fd`, which will eventually be closed through `syscalls`.
    ///
    /// # Safety
    /// `fd` must be an open descriptor that nothing else will close.
    #[inline]
    pub unsafe fn new(fd: RawFd, syscalls: &'static dyn Syscalls) -> Self {
        Self { fd, state: AtomicUsize::new(0), syscalls }
    }

    /// Begins an operation on the descriptor.
    ///
    /// Returns `None` if the descriptor has been closed, in which case nothing changes and the
    /// caller must not perform any I/O. Otherwise the descriptor is guaranteed to stay open until
    /// the returned guard is dropped.
    pub fn acquire(&self) -> Option<FdGuard<'_>> {
        let mut state = self.state.load(Relaxed);
        loop {
            if state & CLOSED != 0 {
                tracing::trace!(fd = self.fd, "acquire refused, descriptor closed");
                return None;
            }
            // Cannot overflow: every in-flight operation occupies a thread.
            #[allow(clippy::arithmetic_side_effects)]
            let new_state = state + ONE_OP;
            match self.state.compare_exchange_weak(state, new_state, Acquire, Relaxed) {
                Ok(..) => return Some(FdGuard(self)),
                Err(actual) => state = actual,
            }
        }
    }

    /// Runs `f` with the descriptor between an acquire and a release.
    ///
    /// Returns `None` without calling `f` if the descriptor has been closed.
    #[inline]
    pub fn with<T>(&self, f: impl FnOnce(RawFd) -> T) -> Option<T> {
        let guard = self.acquire()?;
        Some(f(guard.0.fd))
    }

    fn release(&self) {
        let old_state = self.state.fetch_sub(ONE_OP, AcqRel);
        if old_state == CLOSED | ONE_OP {
            tracing::debug!(fd = self.fd, "performing deferred close");
            if let Err(e) = self.syscalls.close(self.fd) {
                tracing::warn!(fd = self.fd, "deferred close failed: {e}");
            }
        }
    }

    /// Closes the descriptor, or schedules it to be closed once all operations that are currently
    /// in flight have finished.
    ///
    /// Returns immediately either way. After this returns, [`acquire`](Self::acquire) fails.
    /// Calling it again is a no-op.
    ///
    /// # Errors
    /// The error from `close` if it was performed right away. Errors from a deferred close are
    /// logged instead, since there is no caller left to report them to.
    pub fn close(&self) -> Result<()> {
        let old_state = self.state.fetch_or(CLOSED, AcqRel);
        if old_state & CLOSED != 0 {
            return Ok(());
        }
        if old_state == 0 {
            self.syscalls.close(self.fd)
        } else {
            tracing::debug!(fd = self.fd, in_flight = old_state / ONE_OP, "deferring close");
            Ok(())
        }
    }

    /// Returns `true` if [`close`](Self::close) has been called.
    #[inline]
    pub fn is_closed(&self) -> bool { self.state.load(Acquire) & CLOSED != 0 }
    /// Returns the number of operations currently holding the descriptor.
    #[inline]
    pub fn in_flight(&self) -> usize { self.state.load(Acquire) / ONE_OP }
    /// Returns the syscall provider the descriptor is used through.
    #[inline]
    pub fn syscalls(&self) -> &'static dyn Syscalls { self.syscalls }
}

impl Drop for RefCountedFd {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!(fd = self.fd, "close on drop failed: {e}");
        }
    }
}

impl Debug for RefCountedFd {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.load(Relaxed);
        f.debug_struct("RefCountedFd")
            .field("fd", &self.fd)
            .field("closed", &(state & CLOSED != 0))
            .field("in_flight", &(state / ONE_OP))
            .field("backend", &self.syscalls.backend())
            .finish()
    }
}

/// Proof that the descriptor of a [`RefCountedFd`] is open. Releases it when dropped.
#[must_use = "the descriptor is released as soon as the guard is dropped"]
pub struct FdGuard<'a>(&'a RefCountedFd);
impl Deref for FdGuard<'_> {
    type Target = RawFd;
    #[inline]
    fn deref(&self) -> &RawFd { &self.0.fd }
}
impl AsRawFd for FdGuard<'_> {
    #[inline]
    fn as_raw_fd(&self) -> RawFd { self.0.fd }
}
impl AsFd for FdGuard<'_> {
    #[inline]
    fn as_fd(&self) -> BorrowedFd<'_> {
        // SAFETY: the descriptor stays open for as long as the guard exists
        unsafe { BorrowedFd::borrow_raw(self.0.fd) }
    }
}
impl Drop for FdGuard<'_> {
    #[inline]
    fn drop(&mut self) { self.0.release() }
}
impl Debug for FdGuard<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FdGuard").field(&self.0.fd).finish()
    }
}
