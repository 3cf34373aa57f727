#[cfg(not(unix))]
compile_error!(
    "ipcsocket currently only supports Unix-like systems; the named pipe transport is not available"
);

#[cfg(all(unix, not(uds_supported)))]
compile_error!("Unix domain sockets are not known to be supported on this target");
