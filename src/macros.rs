#![allow(unused_macros)]

/// Turns the outcome of a native call into a [`Result`](crate::Result), capturing `errno` and the
/// name of the call on failure. Must be invoked immediately after the call so that nothing gets a
/// chance to clobber `errno`.
macro_rules! ok_or_errno {
    ($operation:literal, $success:expr => $($scb:tt)+) => {
        if $success {
            Ok($($scb)+)
        } else {
            Err($crate::Error::last_os_error($operation))
        }
    };
}

macro_rules! derive_sync_mut_read {
    ($ty:ident) => {
        impl ::std::io::Read for $ty {
            #[inline(always)]
            fn read(&mut self, buf: &mut [u8]) -> ::std::io::Result<usize> {
                ::std::io::Read::read(&mut &*self, buf)
            }
        }
    };
}

macro_rules! derive_sync_mut_write {
    ($ty:ident) => {
        impl ::std::io::Write for $ty {
            #[inline(always)]
            fn write(&mut self, buf: &[u8]) -> ::std::io::Result<usize> {
                ::std::io::Write::write(&mut &*self, buf)
            }
            #[inline(always)]
            fn flush(&mut self) -> ::std::io::Result<()> {
                ::std::io::Write::flush(&mut &*self)
            }
        }
    };
}

macro_rules! derive_sync_mut_rw {
    ($ty:ident) => {
        derive_sync_mut_read!($ty);
        derive_sync_mut_write!($ty);
    };
}

macro_rules! multimacro {
    ($ty:ident, $($macro:ident),+ $(,)?) => {$(
        $macro!($ty);
    )+};
}
