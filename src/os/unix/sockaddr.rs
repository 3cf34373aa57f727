use {
    super::unixprelude::*,
    crate::{Error, Result},
    std::{
        ffi::OsStr,
        fmt::{self, Debug, Formatter},
        mem::size_of,
        path::Path,
        slice,
    },
};

/// Size of the path field of [`SockaddrUn`], including the byte reserved for the nul terminator.
pub const PATH_CAPACITY: usize = 104;
/// Longest path, in bytes, that [`SockaddrUn`] can hold.
pub const MAX_PATH_LEN: usize = PATH_CAPACITY - 1;
/// Offset of the path field from the start of [`SockaddrUn`].
pub const PATH_OFFSET: usize = size_of::<SunFamily>();

#[allow(clippy::as_conversions, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const AF_LOCAL: u8 = libc::AF_UNIX as u8;

/// `sun_len` followed by an 8-bit `sun_family`.
#[cfg(uds_sun_len)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(C)]
struct SunFamily {
    len: u8,
    family: u8,
}
#[cfg(uds_sun_len)]
impl SunFamily {
    #[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
    fn new(path_len: usize) -> Self {
        // Cannot truncate: PATH_OFFSET + MAX_PATH_LEN is 105.
        #[allow(clippy::arithmetic_side_effects)]
        let len = (PATH_OFFSET + path_len) as u8;
        Self { len, family: AF_LOCAL }
    }
    fn family(self) -> u16 { self.family.into() }
}

/// A 16-bit `sun_family` in native byte order.
#[cfg(not(uds_sun_len))]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(transparent)]
struct SunFamily(u16);
#[cfg(not(uds_sun_len))]
impl SunFamily {
    fn new(_path_len: usize) -> Self { Self(AF_LOCAL.into()) }
    fn family(self) -> u16 { self.0 }
}

/// A Unix domain socket address in the binary layout the kernel expects.
///
/// The structure is 106 bytes long: a two-byte header followed by a 104-byte path field. On the
/// BSD family (macOS and iOS included) the header is a length byte and an 8-bit address family;
/// elsewhere it is a 16-bit address family. Which one is used is decided at build time.
///
/// The path is copied verbatim and followed by a nul terminator. Interior nul bytes are not
/// rejected: the kernel, and [`path()`](Self::path), will see the path as ending at the first one.
/// On Linux, a path that *starts* with a nul byte therefore addresses the abstract namespace rather
/// than the filesystem.
#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
pub struct SockaddrUn {
    family: SunFamily,
    path: [u8; PATH_CAPACITY],
}
const _: () = assert!(
    size_of::<SockaddrUn>() == PATH_OFFSET + PATH_CAPACITY,
    "SockaddrUn must not contain padding"
);
const _: () = assert!(
    size_of::<SockaddrUn>() <= size_of::<libc::sockaddr_un>(),
    "SockaddrUn must not be larger than the platform's sockaddr_un"
);

impl SockaddrUn {
    /// Encodes the given path bytes.
    ///
    /// # Errors
    /// [`Error::AddressTooLong`] if `path` is longer than [`MAX_PATH_LEN`] bytes.
    pub fn new(path: &[u8]) -> Result<Self> {
        if path.len() > MAX_PATH_LEN {
            return Err(Error::AddressTooLong { len: path.len(), capacity: PATH_CAPACITY });
        }
        let mut buf = [0; PATH_CAPACITY];
        let (dst, rest) = buf.split_at_mut(path.len());
        dst.copy_from_slice(path);
        if let Some(terminator) = rest.first_mut() {
            *terminator = 0;
        }
        Ok(Self { family: SunFamily::new(path.len()), path: buf })
    }
    /// Encodes a filesystem path, using its raw bytes as they are stored in the `OsStr`.
    #[inline]
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(path.as_ref().as_os_str().as_bytes())
    }

    /// Returns the path bytes up to, but not including, the first nul byte.
    pub fn path(&self) -> &[u8] {
        let end = self.path.iter().position(|&b| b == 0).unwrap_or(PATH_CAPACITY);
        self.path.split_at(end).0
    }
    /// Same as [`path()`](Self::path), but as an `OsStr`.
    #[inline]
    pub fn as_os_str(&self) -> &OsStr { OsStr::from_bytes(self.path()) }

    /// Returns the address family tag, which is always `AF_UNIX`.
    #[inline]
    pub fn family(&self) -> u16 { self.family.family() }
    /// Returns the value of the `sun_len` byte.
    #[cfg(uds_sun_len)]
    #[inline]
    pub fn sun_len(&self) -> u8 { self.family.len }

    /// Returns the full binary representation, exactly as it is handed to the kernel.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the struct is repr(C), contains only integers and has no padding, as checked by
        // the const assertion above
        unsafe { slice::from_raw_parts((self as *const Self).cast::<u8>(), size_of::<Self>()) }
    }

    /// Returns a pointer that can be passed to `bind` or `connect`.
    #[inline]
    pub fn as_ptr(&self) -> *const sockaddr { (self as *const Self).cast() }
    /// Returns a pointer that can be passed to `accept`.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut sockaddr { (self as *mut Self).cast() }
    /// Returns the address length to pass alongside [`as_ptr()`](Self::as_ptr), which is the size
    /// of the whole structure.
    #[inline]
    #[allow(clippy::as_conversions, clippy::cast_possible_truncation)]
    pub fn addr_len(&self) -> socklen_t { size_of::<Self>() as socklen_t }
}

impl Debug for SockaddrUn {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SockaddrUn")
            .field("family", &self.family)
            .field("path", &String::from_utf8_lossy(self.path()))
            .finish()
    }
}
