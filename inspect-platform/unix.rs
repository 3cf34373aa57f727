use {
    super::*,
    ipcsocket::os::unix::{
        syscall::{self, Backend},
        SockaddrUn, UdStream, UdStreamListener, MAX_PATH_LEN, PATH_CAPACITY, PATH_OFFSET,
    },
    libc::{sockaddr, sockaddr_storage, sockaddr_un, socklen_t},
    std::{
        borrow::Cow,
        io::{self, prelude::*, BufReader},
        path::Path,
        thread,
    },
};

pub(super) fn main() {
    print_bitwidths(&bitwidths!(socklen_t));
    print_sizes(&sizes!(sockaddr, sockaddr_storage, sockaddr_un, SockaddrUn));
    println!();

    inspect_layout();
    let backend = inspect_backend();
    if let Some(tmpdir) = select_tmpdir() {
        loopback(&tmpdir, backend);
    }
}

fn inspect_layout() {
    println!("Path offset   : {PATH_OFFSET}");
    println!("Path capacity : {PATH_CAPACITY} ({MAX_PATH_LEN} bytes + terminator)");
    println!(
        "Header layout : {}",
        if cfg!(uds_sun_len) { "sun_len (u8) + sun_family (u8)" } else { "sun_family (u16)" }
    );
    let addr = SockaddrUn::new(b"/x").unwrap_or_exit("Failed to encode a two-byte path");
    let bytes = addr.as_bytes();
    print_hex("Header of \"/x\"", bytes.get(..PATH_OFFSET).unwrap_or_default());
    print_hex("Path of \"/x\"  ", bytes.get(PATH_OFFSET..PATH_OFFSET + 3).unwrap_or_default());
    let too_long = [b'a'; PATH_CAPACITY];
    let _ = SockaddrUn::new(&too_long).map(drop).report_error("Encoding a full-capacity path");
    println!();
}

fn inspect_backend() -> Backend {
    match Backend::from_env() {
        Some(b) => println!("{} = {b}", syscall::BACKEND_ENV_VAR),
        None => println!("{} is unset or invalid", syscall::BACKEND_ENV_VAR),
    }
    let provider = syscall::provider().unwrap_or_exit("Failed to set up the syscall backend");
    let backend = provider.backend();
    println!("Using the {backend} backend");

    let fd = provider
        .socket(libc::AF_UNIX, libc::SOCK_STREAM, 0)
        .unwrap_or_exit("Failed to create a socket");
    println!("Created socket {fd}");
    provider.close(fd).unwrap_or_exit("Failed to close the socket");
    let _ = provider.close(fd).report_error("Closing it again (expected to fail)");
    println!();
    backend
}

fn loopback(tmpdir: &Path, backend: Backend) {
    let path = tmpdir.join(format!("ipcsocket-inspect-platform-{}.sock", std::process::id()));
    let listener = UdStreamListener::bind_with_drop_guard(&path)
        .unwrap_or_exit("Failed to bind the loopback listener");
    println!("Listening at {}", listener.path().display());

    let client = thread::spawn({
        let path = path.clone();
        move || -> io::Result<String> {
            let (recver, sender) = UdStream::connect(&path)?.split();
            (&sender).write_all(format!("{backend}\n").as_bytes())?;
            let mut line = String::new();
            BufReader::new(recver).read_line(&mut line)?;
            Ok(line)
        }
    });
    let conn = listener.accept().unwrap_or_exit("Failed to accept the loopback client");
    let mut line = String::new();
    BufReader::new(&conn).read_line(&mut line).unwrap_or_exit("Failed to read from the client");
    (&conn).write_all(line.as_bytes()).unwrap_or_exit("Failed to write to the client");

    match client.join() {
        Ok(Ok(echo)) => println!("Loopback echo : {:?}", echo.trim_end()),
        Ok(Err(e)) => println!("Loopback client failed: {e}"),
        Err(..) => println!("Loopback client panicked"),
    }
}

fn select_tmpdir() -> Option<Cow<'static, Path>> {
    let dir = std::env::var_os("TMPDIR")
        .map(|v| Cow::Owned(v.into()))
        .unwrap_or(Cow::Borrowed(Path::new("/tmp")));
    if dir.as_os_str().len() > MAX_PATH_LEN / 2 {
        println!("Temporary directory {} is too long to host a socket", dir.display());
        return None;
    }
    match std::fs::metadata(&dir) {
        Ok(md) if md.is_dir() => {
            println!("Using temporary directory {}", dir.display());
            Some(dir)
        }
        Ok(..) => {
            println!("{} is not a directory", dir.display());
            None
        }
        Err(e) => {
            println!("Could not inspect {}: {e}", dir.display());
            None
        }
    }
}
